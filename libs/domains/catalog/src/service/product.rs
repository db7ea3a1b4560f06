//! Product service. Keeps the owning category's `productCount` current.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::category::{derived_slug, normalized_name};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CreateProduct, ListProductsQuery, Product, ProductFilter, ProductView, UpdateProduct,
    PRODUCT_SORT_FIELDS,
};
use crate::pagination::{PageRequest, Paginated, Pagination, Sort};
use crate::repository::{CategoryRepository, ProductRepository};

pub struct ProductService<P: ProductRepository, C: CategoryRepository> {
    products: Arc<P>,
    categories: Arc<C>,
}

impl<P: ProductRepository, C: CategoryRepository> ProductService<P, C> {
    pub fn new(products: Arc<P>, categories: Arc<C>) -> Self {
        Self {
            products,
            categories,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ListProductsQuery,
    ) -> CatalogResult<Paginated<ProductView>> {
        let page = PageRequest::new(query.page, query.limit)?;
        let sort = Sort::resolve(query.sort.as_deref(), query.order, PRODUCT_SORT_FIELDS)?;
        let filter = ProductFilter::from(&query);

        let total = self.products.count(filter.clone()).await?;
        let products = self
            .products
            .list(filter, sort, page.skip(), page.limit)
            .await?;

        Ok(Paginated {
            items: products.into_iter().map(ProductView::from).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id_or_slug: &str) -> CatalogResult<ProductView> {
        if let Ok(id) = Uuid::parse_str(id_or_slug) {
            if let Some(product) = self.products.find_by_id(id).await? {
                return Ok(product.into());
            }
        }

        self.products
            .find_by_slug(id_or_slug)
            .await?
            .map(ProductView::from)
            .ok_or_else(|| CatalogError::ProductNotFound(id_or_slug.to_string()))
    }

    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: CreateProduct) -> CatalogResult<ProductView> {
        input.validate()?;

        let name = normalized_name(&input.name)?;
        let slug = match input.slug {
            Some(ref slug) => slug.clone(),
            None => derived_slug(&name)?,
        };

        if let Some(category) = input.category {
            self.ensure_category(category).await?;
        }
        if self.products.slug_taken(slug.clone(), None).await? {
            return Err(CatalogError::DuplicateSlug(slug));
        }

        let product = Product::new(input, name, slug);
        self.products.insert(&product).await?;

        if let Some(category) = product.category {
            self.refresh_count(category).await?;
        }

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<ProductView> {
        input.validate()?;

        let existing = self.get_by_id(id).await?;

        if let Some(ref name) = input.name {
            normalized_name(name)?;
        }
        if let Some(ref slug) = input.slug {
            if *slug != existing.slug && self.products.slug_taken(slug.clone(), Some(id)).await? {
                return Err(CatalogError::DuplicateSlug(slug.clone()));
            }
        }
        if let Some(Some(category)) = input.category {
            self.ensure_category(category).await?;
        }

        let new_category = input.category;
        let mut updated = existing.clone();
        updated.apply_update(input);
        if let Some(category) = new_category {
            updated.category = category;
        }

        if !self.products.replace(&updated).await? {
            return Err(CatalogError::ProductNotFound(id.to_string()));
        }

        if existing.category != updated.category {
            for category in [existing.category, updated.category].into_iter().flatten() {
                self.refresh_count(category).await?;
            }
        }

        tracing::info!(product_id = %id, "Product updated successfully");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> CatalogResult<()> {
        let existing = self.get_by_id(id).await?;

        if !self.products.delete(id).await? {
            return Err(CatalogError::ProductNotFound(id.to_string()));
        }
        if let Some(category) = existing.category {
            self.refresh_count(category).await?;
        }

        tracing::info!(product_id = %id, "Product deleted successfully");
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))
    }

    async fn ensure_category(&self, id: Uuid) -> CatalogResult<()> {
        match self.categories.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::CategoryNotFound(id.to_string())),
        }
    }

    async fn refresh_count(&self, category: Uuid) -> CatalogResult<()> {
        let count = self.products.count_by_category(category).await?;
        self.categories.set_product_count(category, count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::repository::{MockCategoryRepository, MockProductRepository};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn category() -> Category {
        Category {
            id: Uuid::now_v7(),
            name: "Shoes".to_string(),
            slug: "shoes".to_string(),
            description: String::new(),
            parent: None,
            ancestors: Vec::new(),
            level: 0,
            is_active: true,
            image: None,
            product_count: 0,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(category: Option<Uuid>) -> Product {
        Product {
            id: Uuid::now_v7(),
            name: "Trail Runner".to_string(),
            slug: "trail-runner".to_string(),
            description: String::new(),
            price: 8999,
            images: Vec::new(),
            is_active: true,
            is_featured: false,
            category,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(
        products: MockProductRepository,
        categories: MockCategoryRepository,
    ) -> ProductService<MockProductRepository, MockCategoryRepository> {
        ProductService::new(Arc::new(products), Arc::new(categories))
    }

    #[tokio::test]
    async fn test_create_refreshes_category_count() {
        let mut products = MockProductRepository::new();
        let mut categories = MockCategoryRepository::new();
        let shoes = category();
        let shoes_id = shoes.id;

        categories
            .expect_find_by_id()
            .with(eq(shoes_id))
            .returning(move |_| Ok(Some(shoes.clone())));
        products.expect_slug_taken().returning(|_, _| Ok(false));
        products
            .expect_insert()
            .withf(|p| p.slug == "trail-runner")
            .times(1)
            .returning(|_| Ok(()));
        products
            .expect_count_by_category()
            .with(eq(shoes_id))
            .returning(|_| Ok(1));
        categories
            .expect_set_product_count()
            .with(eq(shoes_id), eq(1))
            .times(1)
            .returning(|_, _| Ok(()));

        let view = service(products, categories)
            .create_product(CreateProduct {
                name: "Trail Runner".to_string(),
                slug: None,
                description: String::new(),
                price: 8999,
                images: Vec::new(),
                is_active: true,
                is_featured: false,
                category: Some(shoes_id),
            })
            .await
            .unwrap();

        assert_eq!(view.category, Some(shoes_id));
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_fails() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_id().returning(|_| Ok(None));
        let mut products = MockProductRepository::new();
        products.expect_insert().never();

        let err = service(products, categories)
            .create_product(CreateProduct {
                name: "Trail Runner".to_string(),
                slug: None,
                description: String::new(),
                price: 8999,
                images: Vec::new(),
                is_active: true,
                is_featured: false,
                category: Some(Uuid::now_v7()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_moving_product_refreshes_both_categories() {
        let mut products = MockProductRepository::new();
        let mut categories = MockCategoryRepository::new();
        let old = category();
        let new = category();
        let (old_id, new_id) = (old.id, new.id);
        let existing = product(Some(old_id));
        let product_id = existing.id;

        products
            .expect_find_by_id()
            .with(eq(product_id))
            .returning(move |_| Ok(Some(existing.clone())));
        categories
            .expect_find_by_id()
            .with(eq(new_id))
            .returning(move |_| Ok(Some(new.clone())));
        products
            .expect_replace()
            .withf(move |p| p.category == Some(new_id))
            .returning(|_| Ok(true));
        products.expect_count_by_category().returning(|_| Ok(0));
        categories
            .expect_set_product_count()
            .with(eq(old_id), eq(0))
            .times(1)
            .returning(|_, _| Ok(()));
        categories
            .expect_set_product_count()
            .with(eq(new_id), eq(0))
            .times(1)
            .returning(|_, _| Ok(()));

        service(products, categories)
            .update_product(
                product_id,
                UpdateProduct {
                    category: Some(Some(new_id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_detaching_product_keeps_other_fields() {
        let mut products = MockProductRepository::new();
        let mut categories = MockCategoryRepository::new();
        let old = category();
        let old_id = old.id;
        let existing = product(Some(old_id));
        let product_id = existing.id;

        products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        products
            .expect_replace()
            .withf(|p| p.category.is_none() && p.price == 8999)
            .returning(|_| Ok(true));
        products.expect_count_by_category().returning(|_| Ok(0));
        categories
            .expect_set_product_count()
            .with(eq(old_id), eq(0))
            .returning(|_, _| Ok(()));

        let view = service(products, categories)
            .update_product(
                product_id,
                UpdateProduct {
                    category: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(view.category, None);
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let mut products = MockProductRepository::new();
        let found = product(None);
        products
            .expect_find_by_slug()
            .with(eq("trail-runner"))
            .returning(move |_| Ok(Some(found.clone())));

        let view = service(products, MockCategoryRepository::new())
            .get_product("trail-runner")
            .await
            .unwrap();
        assert_eq!(view.slug, "trail-runner");
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let mut products = MockProductRepository::new();
        products.expect_find_by_id().returning(|_| Ok(None));
        products.expect_delete().never();

        let err = service(products, MockCategoryRepository::new())
            .delete_product(Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_sort() {
        let err = service(MockProductRepository::new(), MockCategoryRepository::new())
            .list_products(ListProductsQuery {
                sort: Some("stock".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
