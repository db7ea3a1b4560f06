//! Typed path parameter extractor with enveloped rejections.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Deserialized path parameters; a segment that does not parse into `T`
/// becomes `400 INVALID_PARAMETER` in the JSON error envelope.
///
/// Use [`crate::UuidPath`] for UUID segments so they keep the
/// `INVALID_UUID` code.
pub struct PathParam<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParam(value))
            .map_err(|e| AppError::PathRejection(e).into_response())
    }
}
