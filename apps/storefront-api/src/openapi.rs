//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for the storefront
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "Category tree and product catalog backed by MongoDB",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/categories", api = domain_catalog::CategoriesApiDoc),
        (path = "/api/products", api = domain_catalog::ProductsApiDoc)
    ),
    tags(
        (name = "Categories", description = "Hierarchical category management"),
        (name = "Products", description = "Products and their category link")
    )
)]
pub struct ApiDoc;
