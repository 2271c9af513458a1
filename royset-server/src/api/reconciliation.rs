//! Reconciliation observability endpoint.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use royset_core::processors::measure_lag;
use royset_sdk::api::LagResponse;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Build the reconciliation router.
pub fn router() -> Router<AppState> {
    Router::new().route("/reconciliation/lag", get(lag))
}

/// `GET /reconciliation/lag` - distance between the event log head and the
/// highest position the mirror has applied.
async fn lag(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let head = state.engine.event_log().head_position();
    let observation = measure_lag(&state.db, head).await?;
    let threshold = state.config().await.lag_warn_threshold;

    Ok(Json(LagResponse {
        head_position: observation.head_position,
        applied_position: observation.applied_position,
        lag: observation.lag,
        lagging: observation.lag > threshold,
    }))
}
