//! Wires the catalog domain to HTTP routes.

use std::sync::Arc;

use axum::Router;
use domain_catalog::{
    CategoryService, MongoCategoryRepository, MongoProductRepository, ProductService, handlers,
};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let categories = Arc::new(MongoCategoryRepository::new(&state.db));
    let products = Arc::new(MongoProductRepository::new(&state.db));

    Router::new()
        .nest(
            "/categories",
            handlers::categories::router(CategoryService::new(
                categories.clone(),
                products.clone(),
            )),
        )
        .nest(
            "/products",
            handlers::products::router(ProductService::new(products, categories)),
        )
}

/// Create the collection indexes the catalog relies on
pub async fn init_indexes(db: &mongodb::Database) -> eyre::Result<()> {
    MongoCategoryRepository::new(db).init_indexes().await?;
    MongoProductRepository::new(db).init_indexes().await?;
    Ok(())
}
