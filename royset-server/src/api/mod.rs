//! HTTP API handlers.

pub mod admin;
pub mod claims;
pub mod error;
pub mod reconciliation;
pub mod works;

use crate::state::AppState;
use axum::Router;

/// Build the combined API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(works::router())
        .merge(claims::router())
        .merge(admin::router())
        .merge(reconciliation::router())
}
