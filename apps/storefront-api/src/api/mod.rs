//! API routes, nested under `/api` by `axum_helpers::create_router`

pub mod catalog;
pub mod health;

use axum::Router;

use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    catalog::router(state).merge(health::router(state.clone()))
}
