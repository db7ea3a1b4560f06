//! Entities, API views, request DTOs and query filters.

pub mod category;
pub mod product;

pub use category::*;
pub use product::*;

use serde::{Deserialize, Deserializer};

/// Distinguish an explicit `null` (`Some(None)`) from an absent field (`None`).
///
/// Pair with `#[serde(default)]`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
