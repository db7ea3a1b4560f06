use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Parent category not found: {0}")]
    ParentNotFound(Uuid),

    #[error("Category '{0}' already exists under this parent")]
    DuplicateName(String),

    #[error("Slug '{0}' is already taken")]
    DuplicateSlug(String),

    /// Unique index violation that slipped past the pre-checks
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("A category cannot be its own parent")]
    SelfParent,

    #[error("Cannot move a category under one of its own descendants")]
    CircularReference,

    #[error("Category has {0} child categories; use force=true to delete the subtree")]
    HasChildren(u64),

    #[error("Category is referenced by {0} products; use force=true to unlink them")]
    HasProducts(u64),

    #[error("Category {0} was modified concurrently; reload and retry")]
    ConcurrentModification(Uuid),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::Validation(msg) => AppError::Validation(msg),
            CatalogError::CategoryNotFound(_)
            | CatalogError::ProductNotFound(_)
            | CatalogError::ParentNotFound(_) => AppError::NotFound(message),
            CatalogError::DuplicateName(_)
            | CatalogError::DuplicateSlug(_)
            | CatalogError::DuplicateKey(_)
            | CatalogError::ConcurrentModification(_) => AppError::Conflict(message),
            CatalogError::SelfParent
            | CatalogError::CircularReference
            | CatalogError::HasChildren(_)
            | CatalogError::HasProducts(_) => AppError::BadRequest(message),
            CatalogError::Database(msg) => AppError::Database(msg),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DUPLICATE_KEY {
                return CatalogError::DuplicateKey(write_error.message.clone());
            }
        }
        CatalogError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(err: validator::ValidationErrors) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: CatalogError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(CatalogError::Validation("limit".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CatalogError::CategoryNotFound("shoes".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CatalogError::ParentNotFound(Uuid::now_v7())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CatalogError::DuplicateName("Shoes".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CatalogError::ConcurrentModification(Uuid::now_v7())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(CatalogError::CircularReference), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CatalogError::HasChildren(2)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CatalogError::Database("timeout".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
