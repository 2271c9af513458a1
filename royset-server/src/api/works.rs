//! Work registry and deposit handlers.
//!
//! # Endpoints
//!
//! - `POST /works`                       – register a new work
//! - `PUT /works/{work_id}/splits`       – replace the split set
//! - `POST /works/{work_id}/deposits`    – deposit and distribute revenue
//! - `GET /works/{work_id}/recipients`   – current split set

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use royset_core::EngineError;
use royset_core::engine::DepositOutcome;
use royset_sdk::api::{
    DepositRequest, DepositResponse, RecipientsResponse, RegisterWorkRequest, SetSplitsRequest,
    ShareBreakdown, SplitShare,
};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Build the works router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/works", post(register_work))
        .route("/works/{work_id}/splits", put(set_splits))
        .route("/works/{work_id}/deposits", post(deposit))
        .route("/works/{work_id}/recipients", get(recipients))
}

/// `POST /works` - register a new work under an owner identity.
async fn register_work(
    State(state): State<AppState>,
    Json(payload): Json<RegisterWorkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .register_work(payload.work_id, payload.owner)
        .await?;
    Ok(StatusCode::CREATED)
}

/// `PUT /works/{work_id}/splits` - atomically replace the split set.
///
/// Owner-only; the previous split set stays in place if validation fails.
async fn set_splits(
    State(state): State<AppState>,
    Path(work_id): Path<Uuid>,
    Json(payload): Json<SetSplitsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .set_splits(work_id, payload.caller, payload.recipients, payload.shares_bps)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Convert a `DepositOutcome` (engine model) into a `DepositResponse` (API model).
fn to_response(outcome: DepositOutcome) -> DepositResponse {
    DepositResponse {
        work_id: outcome.work_id,
        total_amount: outcome.total_amount as i64,
        shares: outcome
            .shares
            .into_iter()
            .map(|(recipient, amount)| ShareBreakdown {
                recipient,
                amount: amount as i64,
            })
            .collect(),
        remainder: outcome.remainder as i64,
        remainder_recipient: outcome.remainder_recipient,
        origin_tx_id: outcome.origin_tx_id,
        log_position: outcome.log_position,
    }
}

/// `POST /works/{work_id}/deposits` - deposit revenue and distribute it
/// across the current split set. Returns the full breakdown.
async fn deposit(
    State(state): State<AppState>,
    Path(work_id): Path<Uuid>,
    Json(payload): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.amount <= 0 {
        return Err(ApiError::Engine(EngineError::InvalidAmount));
    }
    let outcome = state
        .engine
        .deposit_revenue(work_id, payload.amount as u64)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(outcome))))
}

/// `GET /works/{work_id}/recipients` - the current split set, in order.
async fn recipients(
    State(state): State<AppState>,
    Path(work_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.engine.recipients(work_id).await?;
    Ok(Json(RecipientsResponse {
        work_id,
        recipients: entries
            .into_iter()
            .map(|entry| SplitShare {
                recipient: entry.recipient,
                share_bps: entry.share_bps,
            })
            .collect(),
    }))
}
