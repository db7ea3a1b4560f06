use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use super::product::ProductSummary;
use crate::pagination::{default_limit, default_page, SortOrder};
use crate::slug::validate_slug;

/// Sort keys accepted by `GET /categories`; the first one is the default
pub const CATEGORY_SORT_FIELDS: &[&str] = &[
    "name",
    "slug",
    "level",
    "createdAt",
    "updatedAt",
    "productCount",
];

/// Products embedded by `GET /categories/{idOrSlug}?includeProducts=true`
pub const EMBEDDED_PRODUCTS_LIMIT: i64 = 20;

fn default_true() -> bool {
    true
}

/// Category document stored in the `categories` collection.
///
/// `parent` is authoritative; `ancestors` (root-first, excluding self) and
/// `level` are kept in sync with it on every move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<Uuid>,
    #[serde(default)]
    pub ancestors: Vec<Uuid>,
    #[serde(default)]
    pub level: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub product_count: u64,
    /// Optimistic concurrency token, bumped on every write
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Build a new category placed under `parent` (or at the root)
    pub fn new(input: CreateCategory, name: String, slug: String, parent: Option<&Category>) -> Self {
        let now = Utc::now();
        let (ancestors, level) = Self::lineage_under(parent);
        Self {
            id: Uuid::now_v7(),
            name,
            slug,
            description: input.description,
            parent: parent.map(|p| p.id),
            ancestors,
            level,
            is_active: input.is_active,
            image: input.image,
            product_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// `(ancestors, level)` for a node whose parent is `parent`
    pub fn lineage_under(parent: Option<&Category>) -> (Vec<Uuid>, u32) {
        match parent {
            Some(parent) => {
                let mut ancestors = parent.ancestors.clone();
                ancestors.push(parent.id);
                let level = parent.level + 1;
                (ancestors, level)
            }
            None => (Vec::new(), 0),
        }
    }

    pub fn to_ref(&self) -> CategoryRef {
        CategoryRef {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// `{id, name, slug}` used for populated parent/children references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Category as returned by the API, with parent and children populated
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent: Option<CategoryRef>,
    pub ancestors: Vec<Uuid>,
    pub level: u32,
    pub is_active: bool,
    pub image: Option<String>,
    pub product_count: u64,
    pub version: u64,
    pub children: Vec<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductSummary>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryView {
    pub fn new(category: Category, parent: Option<CategoryRef>, children: Vec<CategoryRef>) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent,
            ancestors: category.ancestors,
            level: category.level,
            is_active: category.is_active,
            image: category.image,
            product_count: category.product_count,
            version: category.version,
            children,
            products: None,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }

    pub fn with_products(mut self, products: Vec<ProductSummary>) -> Self {
        self.products = Some(products);
        self
    }
}

/// Node of the materialized category tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTreeNode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub level: u32,
    pub is_active: bool,
    pub image: Option<String>,
    pub product_count: u64,
    #[schema(no_recursion)]
    pub children: Vec<CategoryTreeNode>,
}

impl From<Category> for CategoryTreeNode {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            level: category.level,
            is_active: category.is_active,
            image: category.image,
            product_count: category.product_count,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from `name` when omitted
    #[validate(length(min = 1, max = 120), custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    pub parent: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(url)]
    pub image: Option<String>,
}

/// Partial update. `parent: null` moves the category to the root; an absent
/// `parent` leaves it where it is.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120), custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub parent: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    #[validate(url)]
    pub image: Option<String>,
    /// Expected current version; a mismatch is rejected as a conflict
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetCategoryImage {
    #[validate(url)]
    pub url: String,
}

/// Fields that may be changed in bulk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkCategoryChanges {
    pub is_active: Option<bool>,
    #[validate(url)]
    pub image: Option<String>,
}

impl BulkCategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateCategories {
    #[validate(length(min = 1, max = 100))]
    pub ids: Vec<Uuid>,
    #[validate(nested)]
    pub updates: BulkCategoryChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCategoryResult {
    pub deleted_categories: u64,
    pub unlinked_products: u64,
}

/// Query string of `GET /categories`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCategoriesQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[param(default = 1, minimum = 1)]
    pub page: i64,
    #[serde(default = "default_limit")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub limit: i64,
    /// name | slug | level | createdAt | updatedAt | productCount
    pub sort: Option<String>,
    #[serde(default)]
    #[param(inline)]
    pub order: SortOrder,
    /// Parent UUID, or `null` for root categories only
    pub parent: Option<String>,
    pub level: Option<u32>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

impl Default for ListCategoriesQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort: None,
            order: SortOrder::Asc,
            parent: None,
            level: None,
            is_active: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    Root,
    Id(Uuid),
}

/// Repository-level category filter; all set fields must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub parent: Option<ParentFilter>,
    pub level: Option<u32>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GetCategoryParams {
    /// Embed up to 20 active products of this category
    #[serde(default)]
    pub include_products: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeleteCategoryParams {
    /// Delete the whole subtree and unlink its products
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}
