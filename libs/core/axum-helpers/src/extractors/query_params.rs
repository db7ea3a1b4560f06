//! Query string extractor with enveloped rejections.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Deserialized query string.
///
/// Behaves like `axum::extract::Query`, but a value that does not parse
/// (`?page=abc`, an unknown enum variant) is answered with
/// `400 INVALID_PARAMETER` in the JSON error envelope instead of plain text.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Paging { page: Option<u64> }
///
/// async fn list(QueryParams(paging): QueryParams<Paging>) -> String {
///     format!("{:?}", paging.page)
/// }
/// ```
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|e| AppError::QueryRejection(e).into_response())
    }
}
