//! Category service: validation, hierarchy rules and cascades

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::hierarchy::{build_tree, rebase_descendants};
use crate::models::{
    BulkUpdateCategories, BulkUpdateResult, Category, CategoryFilter, CategoryRef,
    CategoryTreeNode, CategoryView, CreateCategory, DeleteCategoryResult, ListCategoriesQuery,
    ParentFilter, SetCategoryImage, UpdateCategory, CATEGORY_SORT_FIELDS, EMBEDDED_PRODUCTS_LIMIT,
};
use crate::pagination::{PageRequest, Paginated, Pagination, Sort};
use crate::repository::{CategoryRepository, ProductRepository};
use crate::slug::slugify;

pub struct CategoryService<C: CategoryRepository, P: ProductRepository> {
    categories: Arc<C>,
    products: Arc<P>,
}

impl<C: CategoryRepository, P: ProductRepository> CategoryService<C, P> {
    pub fn new(categories: Arc<C>, products: Arc<P>) -> Self {
        Self {
            categories,
            products,
        }
    }

    /// Filtered, sorted page with parent and children populated
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        query: ListCategoriesQuery,
    ) -> CatalogResult<Paginated<CategoryView>> {
        let page = PageRequest::new(query.page, query.limit)?;
        let sort = Sort::resolve(query.sort.as_deref(), query.order, CATEGORY_SORT_FIELDS)?;
        let filter = category_filter(&query)?;

        let total = self.categories.count(filter.clone()).await?;
        let categories = self
            .categories
            .list(filter, sort, page.skip(), page.limit)
            .await?;

        Ok(Paginated {
            items: self.populate(categories).await?,
            pagination: Pagination::new(page, total),
        })
    }

    /// Look up by UUID first, then by slug
    #[instrument(skip(self))]
    pub async fn get_category(
        &self,
        id_or_slug: &str,
        include_products: bool,
    ) -> CatalogResult<CategoryView> {
        let category = self.find_by_id_or_slug(id_or_slug).await?;
        let id = category.id;
        let view = self.populate_one(category).await?;

        if include_products {
            let products = self
                .products
                .active_by_category(id, EMBEDDED_PRODUCTS_LIMIT)
                .await?;
            return Ok(view.with_products(products));
        }

        Ok(view)
    }

    #[instrument(skip(self, input), fields(category_name = %input.name))]
    pub async fn create_category(&self, input: CreateCategory) -> CatalogResult<CategoryView> {
        input.validate()?;

        let name = normalized_name(&input.name)?;
        let parent = match input.parent {
            Some(parent_id) => Some(
                self.categories
                    .find_by_id(parent_id)
                    .await?
                    .ok_or(CatalogError::ParentNotFound(parent_id))?,
            ),
            None => None,
        };
        let slug = match input.slug {
            Some(ref slug) => slug.clone(),
            None => derived_slug(&name)?,
        };

        if self
            .categories
            .name_taken(name.clone(), input.parent, None)
            .await?
        {
            return Err(CatalogError::DuplicateName(name));
        }
        if self.categories.slug_taken(slug.clone(), None).await? {
            return Err(CatalogError::DuplicateSlug(slug));
        }

        let category = Category::new(input, name, slug, parent.as_ref());
        self.categories.insert(&category).await?;

        // A parent moved after we read it would leave this lineage stale
        if let Some(ref parent) = parent {
            if !self
                .categories
                .touch_version(parent.id, parent.version)
                .await?
            {
                self.categories.delete_many(vec![category.id]).await?;
                tracing::warn!(
                    category_id = %category.id,
                    parent_id = %parent.id,
                    "Parent changed during create, insert rolled back"
                );
                return Err(CatalogError::ConcurrentModification(parent.id));
            }
        }

        tracing::info!(
            category_id = %category.id,
            level = category.level,
            "Category created successfully"
        );
        Ok(CategoryView::new(
            category,
            parent.map(|p| p.to_ref()),
            Vec::new(),
        ))
    }

    /// Partial update; a parent change rebases the whole subtree.
    ///
    /// Creating or moving a category under a parent bumps the parent's
    /// `version`, so two requests that each read the other's lineage cannot
    /// both commit.
    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategory,
    ) -> CatalogResult<CategoryView> {
        input.validate()?;

        let existing = self.get_by_id(id).await?;
        if input.version.is_some_and(|v| v != existing.version) {
            return Err(CatalogError::ConcurrentModification(id));
        }

        let (parent_changed, new_parent) = match input.parent {
            None => (false, None),
            Some(None) => (existing.parent.is_some(), None),
            Some(Some(parent_id)) => {
                if parent_id == id {
                    return Err(CatalogError::SelfParent);
                }
                let parent = self
                    .categories
                    .find_by_id(parent_id)
                    .await?
                    .ok_or(CatalogError::ParentNotFound(parent_id))?;
                if parent.ancestors.contains(&id) {
                    return Err(CatalogError::CircularReference);
                }
                (existing.parent != Some(parent_id), Some(parent))
            }
        };

        let mut updated = existing.clone();

        if parent_changed {
            let (ancestors, level) = Category::lineage_under(new_parent.as_ref());
            updated.parent = new_parent.as_ref().map(|p| p.id);
            updated.ancestors = ancestors;
            updated.level = level;
        }

        if let Some(ref name) = input.name {
            updated.name = normalized_name(name)?;
        }
        if updated.name != existing.name || parent_changed {
            let taken = self
                .categories
                .name_taken(updated.name.clone(), updated.parent, Some(id))
                .await?;
            if taken {
                return Err(CatalogError::DuplicateName(updated.name));
            }
        }

        if let Some(slug) = input.slug {
            if slug != existing.slug && self.categories.slug_taken(slug.clone(), Some(id)).await? {
                return Err(CatalogError::DuplicateSlug(slug));
            }
            updated.slug = slug;
        }
        if let Some(description) = input.description {
            updated.description = description;
        }
        if let Some(is_active) = input.is_active {
            updated.is_active = is_active;
        }
        if let Some(image) = input.image {
            updated.image = Some(image);
        }

        updated.version = existing.version + 1;
        updated.updated_at = Utc::now();

        if !self
            .categories
            .replace_versioned(&updated, existing.version)
            .await?
        {
            return Err(CatalogError::ConcurrentModification(id));
        }

        // The cycle check and the new lineage were computed from the parent
        // as read above; if it has moved since, undo our write.
        if let Some(parent) = new_parent.as_ref().filter(|_| parent_changed) {
            if !self
                .categories
                .touch_version(parent.id, parent.version)
                .await?
            {
                self.restore(&existing, updated.version).await;
                return Err(CatalogError::ConcurrentModification(parent.id));
            }
        }

        // Any request naming a parent re-checks the subtree, which also
        // finishes a rebase interrupted on an earlier attempt.
        if input.parent.is_some() {
            let descendants = self.categories.find_descendants(id).await?;
            let rebased = rebase_descendants(id, &updated.ancestors, &descendants);
            for (descendant_id, ancestors, level) in rebased.iter().cloned() {
                self.categories
                    .set_lineage(descendant_id, ancestors, level)
                    .await?;
            }
            if !rebased.is_empty() {
                tracing::info!(
                    category_id = %id,
                    rebased = rebased.len(),
                    "Category subtree rebased"
                );
            }
        }

        tracing::info!(category_id = %id, version = updated.version, "Category updated successfully");
        self.populate_one(updated).await
    }

    /// Delete a leaf, or with `force` the whole subtree.
    ///
    /// Products are unlinked before categories are removed, and both steps
    /// are filter-based, so a force delete interrupted halfway can simply be
    /// repeated.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid, force: bool) -> CatalogResult<DeleteCategoryResult> {
        self.get_by_id(id).await?;

        if !force {
            let children = self.categories.count_children(id).await?;
            if children > 0 {
                return Err(CatalogError::HasChildren(children));
            }
            let products = self.products.count_by_category(id).await?;
            if products > 0 {
                return Err(CatalogError::HasProducts(products));
            }

            let deleted = self.categories.delete_many(vec![id]).await?;
            tracing::info!(category_id = %id, "Category deleted successfully");
            return Ok(DeleteCategoryResult {
                deleted_categories: deleted,
                unlinked_products: 0,
            });
        }

        let mut subtree = vec![id];
        subtree.extend(
            self.categories
                .find_descendants(id)
                .await?
                .into_iter()
                .map(|c| c.id),
        );

        let unlinked_products = self.products.unlink_categories(subtree.clone()).await?;
        let deleted_categories = self.categories.delete_many(subtree).await?;

        tracing::info!(
            category_id = %id,
            deleted_categories,
            unlinked_products,
            "Category subtree deleted"
        );
        Ok(DeleteCategoryResult {
            deleted_categories,
            unlinked_products,
        })
    }

    #[instrument(skip(self))]
    pub async fn hierarchy(&self, include_inactive: bool) -> CatalogResult<Vec<CategoryTreeNode>> {
        let categories = self.categories.find_all(include_inactive).await?;
        Ok(build_tree(categories))
    }

    #[instrument(skip(self))]
    pub async fn categories_by_level(
        &self,
        level: u32,
        include_inactive: bool,
    ) -> CatalogResult<Vec<CategoryView>> {
        let categories = self
            .categories
            .find_by_level(level, include_inactive)
            .await?;
        self.populate(categories).await
    }

    #[instrument(skip(self, input))]
    pub async fn set_image(&self, id: Uuid, input: SetCategoryImage) -> CatalogResult<CategoryView> {
        input.validate()?;
        let category = self
            .categories
            .set_image(id, Some(input.url))
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))?;

        tracing::info!(category_id = %id, "Category image set");
        self.populate_one(category).await
    }

    #[instrument(skip(self))]
    pub async fn remove_image(&self, id: Uuid) -> CatalogResult<CategoryView> {
        let category = self
            .categories
            .set_image(id, None)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))?;

        tracing::info!(category_id = %id, "Category image removed");
        self.populate_one(category).await
    }

    #[instrument(skip(self, input), fields(ids = input.ids.len()))]
    pub async fn bulk_update(&self, input: BulkUpdateCategories) -> CatalogResult<BulkUpdateResult> {
        input.validate()?;
        if input.updates.is_empty() {
            return Err(CatalogError::Validation(
                "updates must change at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = input.ids.into_iter().filter(|id| seen.insert(*id)).collect();

        let result = self.categories.bulk_update(ids, input.updates).await?;
        tracing::info!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Categories bulk updated"
        );
        Ok(result)
    }

    /// Recompute the cached `productCount` of `id`
    #[instrument(skip(self))]
    pub async fn refresh_product_count(&self, id: Uuid) -> CatalogResult<u64> {
        let count = self.products.count_by_category(id).await?;
        self.categories.set_product_count(id, count).await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))
    }

    async fn find_by_id_or_slug(&self, id_or_slug: &str) -> CatalogResult<Category> {
        if let Ok(id) = Uuid::parse_str(id_or_slug) {
            if let Some(category) = self.categories.find_by_id(id).await? {
                return Ok(category);
            }
        }

        self.categories
            .find_by_slug(id_or_slug)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(id_or_slug.to_string()))
    }

    /// Put `previous` back after a write at `written_version` turned out to
    /// race with a parent move
    async fn restore(&self, previous: &Category, written_version: u64) {
        let mut restored = previous.clone();
        restored.version = written_version + 1;
        restored.updated_at = Utc::now();
        match self
            .categories
            .replace_versioned(&restored, written_version)
            .await
        {
            Ok(true) => tracing::warn!(
                category_id = %previous.id,
                "Parent changed during move, update reverted"
            ),
            Ok(false) => tracing::error!(
                category_id = %previous.id,
                "Parent changed during move and the category was modified again before revert"
            ),
            Err(e) => tracing::error!(
                category_id = %previous.id,
                error = %e,
                "Failed to revert category after concurrent parent change"
            ),
        }
    }

    async fn populate_one(&self, category: Category) -> CatalogResult<CategoryView> {
        let mut views = self.populate(vec![category]).await?;
        views
            .pop()
            .ok_or_else(|| CatalogError::Internal("populate returned no category".to_string()))
    }

    /// Attach `{id, name, slug}` references for parents and direct children
    /// using one query each
    async fn populate(&self, categories: Vec<Category>) -> CatalogResult<Vec<CategoryView>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let parent_ids: Vec<Uuid> = categories
            .iter()
            .filter_map(|c| c.parent)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let parents: HashMap<Uuid, CategoryRef> = self
            .categories
            .find_by_ids(parent_ids)
            .await?
            .iter()
            .map(|p| (p.id, p.to_ref()))
            .collect();

        let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let mut children: HashMap<Uuid, Vec<CategoryRef>> = HashMap::new();
        for child in self.categories.find_children(ids).await? {
            if let Some(parent) = child.parent {
                children.entry(parent).or_default().push(child.to_ref());
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let parent = category.parent.and_then(|p| parents.get(&p).cloned());
                let kids = children.remove(&category.id).unwrap_or_default();
                CategoryView::new(category, parent, kids)
            })
            .collect())
    }
}

fn category_filter(query: &ListCategoriesQuery) -> CatalogResult<CategoryFilter> {
    let parent = match query.parent.as_deref().map(str::trim) {
        None | Some("") => None,
        Some("null") => Some(ParentFilter::Root),
        Some(raw) => Some(ParentFilter::Id(Uuid::parse_str(raw).map_err(|_| {
            CatalogError::Validation(format!("parent must be a UUID or null, got '{}'", raw))
        })?)),
    };

    Ok(CategoryFilter {
        parent,
        level: query.level,
        is_active: query.is_active,
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

pub(crate) fn normalized_name(name: &str) -> CatalogResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation("name must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn derived_slug(name: &str) -> CatalogResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(CatalogError::Validation(format!(
            "cannot derive a slug from '{}'; provide one explicitly",
            name
        )));
    }
    Ok(slug)
}
