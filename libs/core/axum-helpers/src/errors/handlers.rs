use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Fallback for unmatched routes, rendered in the standard error envelope
pub async fn not_found() -> Response {
    let body = ErrorResponse::new(
        ErrorCode::NotFound,
        "The requested resource was not found".to_string(),
        None,
    );

    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}
