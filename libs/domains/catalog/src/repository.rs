use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    BulkCategoryChanges, BulkUpdateResult, Category, CategoryFilter, Product, ProductFilter,
    ProductSummary,
};
use crate::pagination::Sort;

/// Persistence for categories.
///
/// Business rules (uniqueness, cycles, cascades) live in the service; the
/// repository only runs filter-based reads and writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert(&self, category: &Category) -> CatalogResult<()>;

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>>;

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Category>>;

    async fn list(
        &self,
        filter: CategoryFilter,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> CatalogResult<Vec<Category>>;

    async fn count(&self, filter: CategoryFilter) -> CatalogResult<u64>;

    /// Whether another category named `name` exists under `parent`
    async fn name_taken(
        &self,
        name: String,
        parent: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool>;

    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> CatalogResult<bool>;

    async fn count_children(&self, id: Uuid) -> CatalogResult<u64>;

    /// Direct children of any of `parent_ids`, sorted by name
    async fn find_children(&self, parent_ids: Vec<Uuid>) -> CatalogResult<Vec<Category>>;

    /// Every category with `id` in its ancestor path
    async fn find_descendants(&self, id: Uuid) -> CatalogResult<Vec<Category>>;

    /// Replace the stored document only if its version is still `expected_version`.
    ///
    /// Returns `false` when nothing matched.
    async fn replace_versioned(
        &self,
        category: &Category,
        expected_version: u64,
    ) -> CatalogResult<bool>;

    /// Bump `version` if it still equals `expected_version`, leaving the
    /// rest of the document alone. Returns `false` when nothing matched.
    async fn touch_version(&self, id: Uuid, expected_version: u64) -> CatalogResult<bool>;

    async fn set_lineage(&self, id: Uuid, ancestors: Vec<Uuid>, level: u32) -> CatalogResult<()>;

    async fn delete_many(&self, ids: Vec<Uuid>) -> CatalogResult<u64>;

    /// All categories sorted by `(level, name)`
    async fn find_all(&self, include_inactive: bool) -> CatalogResult<Vec<Category>>;

    async fn find_by_level(&self, level: u32, include_inactive: bool)
        -> CatalogResult<Vec<Category>>;

    /// Set or clear the image, returning the updated document
    async fn set_image(&self, id: Uuid, image: Option<String>) -> CatalogResult<Option<Category>>;

    async fn bulk_update(
        &self,
        ids: Vec<Uuid>,
        changes: BulkCategoryChanges,
    ) -> CatalogResult<BulkUpdateResult>;

    async fn set_product_count(&self, id: Uuid, count: u64) -> CatalogResult<()>;
}

/// Persistence for products
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> CatalogResult<()>;

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>>;

    async fn list(
        &self,
        filter: ProductFilter,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> CatalogResult<Vec<Product>>;

    async fn count(&self, filter: ProductFilter) -> CatalogResult<u64>;

    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> CatalogResult<bool>;

    async fn replace(&self, product: &Product) -> CatalogResult<bool>;

    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64>;

    /// Active products of `category`, projected to summaries
    async fn active_by_category(
        &self,
        category: Uuid,
        limit: i64,
    ) -> CatalogResult<Vec<ProductSummary>>;

    /// Clear `category` on every product pointing at any of `category_ids`
    async fn unlink_categories(&self, category_ids: Vec<Uuid>) -> CatalogResult<u64>;
}
