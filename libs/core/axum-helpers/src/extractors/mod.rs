//! Custom extractors for Axum handlers.
//!
//! Rejections are rendered through [`crate::AppError`] so malformed input
//! gets the same envelope as domain errors.

pub mod path_param;
pub mod query_params;
pub mod uuid_path;
pub mod validated_json;

pub use path_param::PathParam;
pub use query_params::QueryParams;
pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
