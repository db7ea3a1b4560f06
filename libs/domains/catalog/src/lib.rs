//! Catalog Domain
//!
//! Hierarchical product categories and the products filed under them, stored
//! in MongoDB.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /categories and /products endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, tree rules, cascades
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (traits + MongoDB implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, views, DTOs
//! └─────────────┘
//! ```
//!
//! Every category stores its materialized ancestor path (`ancestors`) and
//! depth (`level`), so subtree queries are a single indexed filter and the
//! full tree is assembled in memory by [`hierarchy::build_tree`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_catalog::{
//!     handlers,
//!     mongodb::{MongoCategoryRepository, MongoProductRepository},
//!     service::{CategoryService, ProductService},
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("catalog");
//!
//! let categories = Arc::new(MongoCategoryRepository::new(&db));
//! let products = Arc::new(MongoProductRepository::new(&db));
//!
//! let router = axum::Router::new()
//!     .nest(
//!         "/categories",
//!         handlers::categories::router(CategoryService::new(categories.clone(), products.clone())),
//!     )
//!     .nest(
//!         "/products",
//!         handlers::products::router(ProductService::new(products, categories)),
//!     );
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod hierarchy;
pub mod models;
pub mod mongodb;
pub mod pagination;
pub mod repository;
pub mod service;
pub mod slug;

pub use error::{CatalogError, CatalogResult};
pub use handlers::categories::ApiDoc as CategoriesApiDoc;
pub use handlers::products::ApiDoc as ProductsApiDoc;
pub use models::{
    Category, CategoryRef, CategoryTreeNode, CategoryView, CreateCategory, CreateProduct, Product,
    ProductSummary, ProductView, UpdateCategory, UpdateProduct,
};
pub use mongodb::{MongoCategoryRepository, MongoProductRepository};
pub use pagination::{Paginated, Pagination, SortOrder};
pub use repository::{CategoryRepository, ProductRepository};
pub use service::{CategoryService, ProductService};
