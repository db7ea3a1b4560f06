//! HTTP handlers for `/categories`

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, put},
    Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestParameterResponse, BadRequestResponse, BadRequestUuidResponse,
        BadRequestValidationResponse, ConflictResponse, InternalServerErrorResponse, NotFoundResponse,
    },
    ApiResponse, PathParam, QueryParams, UuidPath, ValidatedJson,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::CatalogResult;
use crate::models::{
    BulkCategoryChanges, BulkUpdateCategories, BulkUpdateResult, CategoryRef, CategoryTreeNode,
    CategoryView, CreateCategory, DeleteCategoryParams, DeleteCategoryResult, GetCategoryParams,
    IncludeInactiveParams, ListCategoriesQuery, ProductSummary, SetCategoryImage, UpdateCategory,
};
use crate::pagination::{Paginated, Pagination, SortOrder};
use crate::repository::{CategoryRepository, ProductRepository};
use crate::service::CategoryService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_categories,
        create_category,
        get_hierarchy,
        bulk_update_categories,
        list_by_level,
        get_category,
        update_category,
        delete_category,
        set_category_image,
        remove_category_image,
    ),
    components(
        schemas(
            CategoryView, CategoryRef, CategoryTreeNode, ProductSummary, CreateCategory,
            UpdateCategory, SetCategoryImage, BulkUpdateCategories, BulkCategoryChanges,
            BulkUpdateResult, DeleteCategoryResult, Pagination, SortOrder
        ),
        responses(
            NotFoundResponse,
            BadRequestResponse,
            BadRequestParameterResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Categories", description = "Category tree management")
    )
)]
pub struct ApiDoc;

pub fn router<C, P>(service: CategoryService<C, P>) -> Router
where
    C: CategoryRepository + 'static,
    P: ProductRepository + 'static,
{
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/hierarchy", get(get_hierarchy))
        .route("/bulk", patch(bulk_update_categories))
        .route("/level/{level}", get(list_by_level))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route(
            "/{id}/image",
            put(set_category_image).delete(remove_category_image),
        )
        .with_state(Arc::new(service))
}

/// List categories with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "Categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "Page of categories", body = ApiResponse<Paginated<CategoryView>>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    QueryParams(query): QueryParams<ListCategoriesQuery>,
) -> CatalogResult<ApiResponse<Paginated<CategoryView>>> {
    let page = service.list_categories(query).await?;
    Ok(ApiResponse::ok(page))
}

/// Create a category
#[utoipa::path(
    post,
    path = "",
    tag = "Categories",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryView>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_category<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> CatalogResult<(StatusCode, ApiResponse<CategoryView>)> {
    let category = service.create_category(input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(category, "Category created successfully"),
    ))
}

/// Full category tree
#[utoipa::path(
    get,
    path = "/hierarchy",
    tag = "Categories",
    params(IncludeInactiveParams),
    responses(
        (status = 200, description = "Category forest", body = ApiResponse<Vec<CategoryTreeNode>>),
        (status = 400, response = BadRequestParameterResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_hierarchy<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    QueryParams(params): QueryParams<IncludeInactiveParams>,
) -> CatalogResult<ApiResponse<Vec<CategoryTreeNode>>> {
    let tree = service.hierarchy(params.include_inactive).await?;
    Ok(ApiResponse::ok(tree))
}

/// Change `isActive` and/or `image` on up to 100 categories
#[utoipa::path(
    patch,
    path = "/bulk",
    tag = "Categories",
    request_body = BulkUpdateCategories,
    responses(
        (status = 200, description = "Bulk update applied", body = ApiResponse<BulkUpdateResult>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn bulk_update_categories<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    ValidatedJson(input): ValidatedJson<BulkUpdateCategories>,
) -> CatalogResult<ApiResponse<BulkUpdateResult>> {
    let result = service.bulk_update(input).await?;
    let message = format!(
        "{} categories matched, {} modified",
        result.matched_count, result.modified_count
    );
    Ok(ApiResponse::with_message(result, message))
}

/// Categories at one depth of the tree
#[utoipa::path(
    get,
    path = "/level/{level}",
    tag = "Categories",
    params(
        ("level" = u32, Path, description = "Depth, 0 for roots"),
        IncludeInactiveParams
    ),
    responses(
        (status = 200, description = "Categories at the level", body = ApiResponse<Vec<CategoryView>>),
        (status = 400, response = BadRequestParameterResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_by_level<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    PathParam(level): PathParam<u32>,
    QueryParams(params): QueryParams<IncludeInactiveParams>,
) -> CatalogResult<ApiResponse<Vec<CategoryView>>> {
    let categories = service
        .categories_by_level(level, params.include_inactive)
        .await?;
    Ok(ApiResponse::ok(categories))
}

/// Get a category by id or slug
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Categories",
    params(
        ("id" = String, Path, description = "Category UUID or slug"),
        GetCategoryParams
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryView>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_category<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    PathParam(id_or_slug): PathParam<String>,
    QueryParams(params): QueryParams<GetCategoryParams>,
) -> CatalogResult<ApiResponse<CategoryView>> {
    let category = service
        .get_category(&id_or_slug, params.include_products)
        .await?;
    Ok(ApiResponse::ok(category))
}

/// Partially update a category, possibly moving it
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Categories",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryView>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_category<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCategory>,
) -> CatalogResult<ApiResponse<CategoryView>> {
    let category = service.update_category(id, input).await?;
    Ok(ApiResponse::with_message(
        category,
        "Category updated successfully",
    ))
}

/// Delete a category; `force=true` removes the subtree and unlinks products
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        DeleteCategoryParams
    ),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<DeleteCategoryResult>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_category<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    UuidPath(id): UuidPath,
    QueryParams(params): QueryParams<DeleteCategoryParams>,
) -> CatalogResult<ApiResponse<DeleteCategoryResult>> {
    let result = service.delete_category(id, params.force).await?;
    Ok(ApiResponse::with_message(
        result,
        "Category deleted successfully",
    ))
}

/// Attach an image URL
#[utoipa::path(
    put,
    path = "/{id}/image",
    tag = "Categories",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = SetCategoryImage,
    responses(
        (status = 200, description = "Image set", body = ApiResponse<CategoryView>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn set_category_image<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<SetCategoryImage>,
) -> CatalogResult<ApiResponse<CategoryView>> {
    let category = service.set_image(id, input).await?;
    Ok(ApiResponse::with_message(category, "Image uploaded successfully"))
}

/// Detach the image
#[utoipa::path(
    delete,
    path = "/{id}/image",
    tag = "Categories",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Image removed", body = ApiResponse<CategoryView>),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn remove_category_image<C: CategoryRepository, P: ProductRepository>(
    State(service): State<Arc<CategoryService<C, P>>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<ApiResponse<CategoryView>> {
    let category = service.remove_image(id).await?;
    Ok(ApiResponse::with_message(category, "Image removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
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

    fn app(categories: MockCategoryRepository, products: MockProductRepository) -> Router {
        router(CategoryService::new(Arc::new(categories), Arc::new(products)))
    }

    fn stored(name: &str, parent: Option<&Category>) -> Category {
        let (ancestors, level) = Category::lineage_under(parent);
        Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: String::new(),
            parent: parent.map(|p| p.id),
            ancestors,
            level,
            is_active: true,
            image: None,
            product_count: 0,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_201_with_envelope() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_name_taken().returning(|_, _, _| Ok(false));
        categories.expect_slug_taken().returning(|_, _| Ok(false));
        categories.expect_insert().returning(|_| Ok(()));

        let response = app(categories, MockProductRepository::new())
            .oneshot(json_request("POST", "/", json!({ "name": "Outdoor Gear" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "outdoor-gear");
        assert_eq!(body["data"]["level"], 0);
        assert_eq!(body["data"]["parent"], Value::Null);
        assert_eq!(body["message"], "Category created successfully");
    }

    #[tokio::test]
    async fn test_create_with_empty_name_is_400() {
        let response = app(MockCategoryRepository::new(), MockProductRepository::new())
            .oneshot(json_request("POST", "/", json!({ "name": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_409() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_name_taken().returning(|_, _, _| Ok(true));

        let response = app(categories, MockProductRepository::new())
            .oneshot(json_request("POST", "/", json!({ "name": "Shoes" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_list_returns_pagination_metadata() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_count().returning(|_| Ok(25));
        categories.expect_list().returning(|_, _, skip, limit| {
            assert_eq!((skip, limit), (20, 10));
            Ok((0..5).map(|i| stored(&format!("C{}", i), None)).collect())
        });
        categories.expect_find_by_ids().returning(|_| Ok(Vec::new()));
        categories.expect_find_children().returning(|_| Ok(Vec::new()));

        let response = app(categories, MockProductRepository::new())
            .oneshot(
                Request::builder()
                    .uri("/?page=3&limit=10&sort=createdAt&order=desc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 5);
        let pagination = &body["data"]["pagination"];
        assert_eq!(pagination["currentPage"], 3);
        assert_eq!(pagination["totalPages"], 3);
        assert_eq!(pagination["totalItems"], 25);
        assert_eq!(pagination["hasNext"], false);
        assert_eq!(pagination["hasPrev"], true);
    }

    #[tokio::test]
    async fn test_list_with_limit_over_max_is_400() {
        let response = app(MockCategoryRepository::new(), MockProductRepository::new())
            .oneshot(Request::builder().uri("/?limit=500").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unparseable_query_values_use_error_envelope() {
        for uri in ["/?page=abc", "/?order=sideways", "/hierarchy?includeInactive=maybe"] {
            let response = app(MockCategoryRepository::new(), MockProductRepository::new())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body = json_body(response.into_body()).await;
            assert_eq!(body["success"], false, "{}", uri);
            assert_eq!(body["error"], "INVALID_PARAMETER", "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_level_route_populates_parent() {
        let mut categories = MockCategoryRepository::new();
        let root = stored("Apparel", None);
        let mut child = stored("Shoes", Some(&root));
        child.is_active = false;
        let level_one = vec![child];
        let parents = vec![root.clone()];
        categories
            .expect_find_by_level()
            .withf(|level, include_inactive| *level == 1 && *include_inactive)
            .returning(move |_, _| Ok(level_one.clone()));
        categories
            .expect_find_by_ids()
            .returning(move |_| Ok(parents.clone()));
        categories.expect_find_children().returning(|_| Ok(Vec::new()));

        let response = app(categories, MockProductRepository::new())
            .oneshot(
                Request::builder()
                    .uri("/level/1?includeInactive=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["level"], 1);
        assert_eq!(items[0]["isActive"], false);
        assert_eq!(items[0]["parent"]["slug"], "apparel");
        assert_eq!(items[0]["parent"]["id"], root.id.to_string());
    }

    #[tokio::test]
    async fn test_level_route_rejects_non_numeric_level() {
        let response = app(MockCategoryRepository::new(), MockProductRepository::new())
            .oneshot(Request::builder().uri("/level/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_get_unknown_slug_is_404() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_slug().returning(|_| Ok(None));

        let response = app(categories, MockProductRepository::new())
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_with_children_is_400() {
        let mut categories = MockCategoryRepository::new();
        let node = stored("Shoes", None);
        let id = node.id;
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(node.clone())));
        categories.expect_count_children().returning(|_| Ok(1));
        categories.expect_delete_many().never();

        let response = app(categories, MockProductRepository::new())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_force_delete_reports_counts() {
        let mut categories = MockCategoryRepository::new();
        let mut products = MockProductRepository::new();
        let node = stored("Shoes", None);
        let id = node.id;
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(node.clone())));
        categories.expect_find_descendants().returning(|_| Ok(Vec::new()));
        products.expect_unlink_categories().returning(|_| Ok(2));
        categories.expect_delete_many().returning(|_| Ok(1));

        let response = app(categories, products)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{}?force=true", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"]["deletedCategories"], 1);
        assert_eq!(body["data"]["unlinkedProducts"], 2);
    }

    #[tokio::test]
    async fn test_update_with_invalid_uuid_is_400() {
        let response = app(MockCategoryRepository::new(), MockProductRepository::new())
            .oneshot(json_request("PUT", "/not-a-uuid", json!({ "name": "x" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "INVALID_UUID");
    }

    #[tokio::test]
    async fn test_hierarchy_route() {
        let mut categories = MockCategoryRepository::new();
        let root = stored("Root", None);
        let child = stored("Child", Some(&root));
        let all = vec![root, child];
        categories
            .expect_find_all()
            .withf(|include_inactive| *include_inactive)
            .returning(move |_| Ok(all.clone()));

        let response = app(categories, MockProductRepository::new())
            .oneshot(
                Request::builder()
                    .uri("/hierarchy?includeInactive=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        let roots = body["data"].as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["children"][0]["name"], "Child");
    }

    #[tokio::test]
    async fn test_bulk_update_route() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_bulk_update().returning(|ids, _| {
            Ok(BulkUpdateResult {
                matched_count: ids.len() as u64,
                modified_count: 1,
            })
        });

        let response = app(categories, MockProductRepository::new())
            .oneshot(json_request(
                "PATCH",
                "/bulk",
                json!({
                    "ids": [Uuid::now_v7(), Uuid::now_v7()],
                    "updates": { "isActive": false }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"]["matchedCount"], 2);
        assert_eq!(body["data"]["modifiedCount"], 1);
    }

    #[tokio::test]
    async fn test_set_image_rejects_non_url() {
        let response = app(MockCategoryRepository::new(), MockProductRepository::new())
            .oneshot(json_request(
                "PUT",
                &format!("/{}/image", Uuid::now_v7()),
                json!({ "url": "not a url" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_openapi_lists_category_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/hierarchy"));
        assert!(doc.paths.paths.contains_key("/{id}/image"));
    }
}
