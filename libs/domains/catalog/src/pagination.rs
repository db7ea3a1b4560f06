//! Page/limit validation, sort allowlists and pagination metadata.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{CatalogError, CatalogResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub(crate) fn default_page() -> i64 {
    DEFAULT_PAGE
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// MongoDB sort direction
    pub fn direction(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// A validated sort key. `field` is always one of the allowlisted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub order: SortOrder,
}

impl Sort {
    /// Resolve `requested` against `allowed`; `None` falls back to the first entry.
    pub fn resolve(
        requested: Option<&str>,
        order: SortOrder,
        allowed: &[&'static str],
    ) -> CatalogResult<Self> {
        let field = match requested {
            None => allowed
                .first()
                .copied()
                .ok_or_else(|| CatalogError::Internal("empty sort allowlist".to_string()))?,
            Some(key) => allowed
                .iter()
                .copied()
                .find(|allowed| *allowed == key)
                .ok_or_else(|| {
                    CatalogError::Validation(format!(
                        "sort must be one of: {}",
                        allowed.join(", ")
                    ))
                })?,
        };

        Ok(Self { field, order })
    }
}

/// Validated `page`/`limit` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> CatalogResult<Self> {
        if page < 1 {
            return Err(CatalogError::Validation("page must be >= 1".to_string()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(CatalogError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        Ok(Self {
            page: page as u64,
            limit: limit as u64,
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.limit,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
