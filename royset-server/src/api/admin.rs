//! Operator endpoints.
//!
//! # Endpoints
//!
//! - `POST /admin/emergency-withdraw`  – operator-only custody withdrawal
//! - `GET /admin/rejected-events`      – quarantined events awaiting review

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use kanau::processor::Processor;
use royset_core::EngineError;
use royset_core::entities::rejected_event::ListRejectedEvents;
use royset_core::framework::DatabaseProcessor;
use royset_sdk::api::EmergencyWithdrawRequest;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/emergency-withdraw", post(emergency_withdraw))
        .route("/admin/rejected-events", get(rejected_events))
}

/// `POST /admin/emergency-withdraw` - withdraw custodied funds out of
/// band. The caller must be the configured operator identity.
async fn emergency_withdraw(
    State(state): State<AppState>,
    Json(payload): Json<EmergencyWithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.amount <= 0 {
        return Err(ApiError::Engine(EngineError::InvalidAmount));
    }
    state
        .engine
        .emergency_withdraw(payload.caller, payload.amount as u64)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct RejectedEventView {
    origin_tx_id: Uuid,
    log_position: i64,
    event_type: String,
    reason: String,
    payload: String,
    rejected_at: i64,
}

/// `GET /admin/rejected-events` - events the reconciler quarantined, with
/// the raw payload for inspection.
async fn rejected_events(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rejected = DatabaseProcessor {
        pool: state.db.clone(),
    }
    .process(ListRejectedEvents)
    .await?;

    Ok(Json(
        rejected
            .into_iter()
            .map(|r| RejectedEventView {
                origin_tx_id: r.origin_tx_id,
                log_position: r.log_position,
                event_type: r.event_type,
                reason: r.reason,
                payload: r.payload,
                rejected_at: r.rejected_at,
            })
            .collect::<Vec<_>>(),
    ))
}
