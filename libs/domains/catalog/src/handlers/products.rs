//! HTTP handlers for `/products`

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
    ApiResponse, PathParam, QueryParams, UuidPath, ValidatedJson,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::CatalogResult;
use crate::models::{CreateProduct, ListProductsQuery, ProductView, UpdateProduct};
use crate::pagination::{Paginated, Pagination};
use crate::repository::{CategoryRepository, ProductRepository};
use crate::service::ProductService;

#[derive(OpenApi)]
#[openapi(
    paths(list_products, create_product, get_product, update_product, delete_product),
    components(
        schemas(ProductView, CreateProduct, UpdateProduct, Pagination),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Products and their category link")
    )
)]
pub struct ApiDoc;

pub fn router<P, C>(service: ProductService<P, C>) -> Router
where
    P: ProductRepository + 'static,
    C: CategoryRepository + 'static,
{
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(Arc::new(service))
}

/// List products with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Page of products", body = ApiResponse<Paginated<ProductView>>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<P: ProductRepository, C: CategoryRepository>(
    State(service): State<Arc<ProductService<P, C>>>,
    QueryParams(query): QueryParams<ListProductsQuery>,
) -> CatalogResult<ApiResponse<Paginated<ProductView>>> {
    let page = service.list_products(query).await?;
    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductView>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<P: ProductRepository, C: CategoryRepository>(
    State(service): State<Arc<ProductService<P, C>>>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> CatalogResult<(StatusCode, ApiResponse<ProductView>)> {
    let product = service.create_product(input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(product, "Product created successfully"),
    ))
}

/// Get a product by id or slug
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = String, Path, description = "Product UUID or slug")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductView>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<P: ProductRepository, C: CategoryRepository>(
    State(service): State<Arc<ProductService<P, C>>>,
    PathParam(id_or_slug): PathParam<String>,
) -> CatalogResult<ApiResponse<ProductView>> {
    let product = service.get_product(&id_or_slug).await?;
    Ok(ApiResponse::ok(product))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductView>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<P: ProductRepository, C: CategoryRepository>(
    State(service): State<Arc<ProductService<P, C>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> CatalogResult<ApiResponse<ProductView>> {
    let product = service.update_product(id, input).await?;
    Ok(ApiResponse::with_message(product, "Product updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<P: ProductRepository, C: CategoryRepository>(
    State(service): State<Arc<ProductService<P, C>>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use crate::repository::{MockCategoryRepository, MockProductRepository};
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn json_body(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app(products: MockProductRepository, categories: MockCategoryRepository) -> Router {
        router(ProductService::new(Arc::new(products), Arc::new(categories)))
    }

    fn stored() -> Product {
        Product {
            id: Uuid::now_v7(),
            name: "Trail Runner".to_string(),
            slug: "trail-runner".to_string(),
            description: String::new(),
            price: 8999,
            images: Vec::new(),
            is_active: true,
            is_featured: false,
            category: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_product() {
        let mut products = MockProductRepository::new();
        products.expect_slug_taken().returning(|_, _| Ok(false));
        products.expect_insert().returning(|_| Ok(()));

        let response = app(products, MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "name": "Trail Runner", "price": 8999 }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"]["slug"], "trail-runner");
        assert_eq!(body["data"]["isActive"], true);
        assert_eq!(body["data"]["category"], Value::Null);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let response = app(MockProductRepository::new(), MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "name": "X", "price": -1 }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_by_uuid() {
        let mut products = MockProductRepository::new();
        let product = stored();
        let id = product.id;
        products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(product.clone())));

        let response = app(products, MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"]["id"], id.to_string());
        assert_eq!(body["data"]["price"], 8999);
    }

    #[tokio::test]
    async fn test_delete_returns_204() {
        let mut products = MockProductRepository::new();
        let product = stored();
        let id = product.id;
        products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        products.expect_delete().returning(|_| Ok(true));

        let response = app(products, MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_sort_field() {
        let response = app(MockProductRepository::new(), MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .uri("/?sort=stock")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_list_with_malformed_category_filter_uses_error_envelope() {
        let response = app(MockProductRepository::new(), MockCategoryRepository::new())
            .oneshot(
                Request::builder()
                    .uri("/?category=shoes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "INVALID_PARAMETER");
    }
}
