//! Claim and mirror-read handlers.
//!
//! # Endpoints
//!
//! - `POST /claims/{identity}`          – claim the full pending balance
//! - `GET /wallets/{identity}`          – mirrored balance and payout history

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use kanau::processor::Processor;
use royset_core::entities::payout::GetPayoutsByIdentity;
use royset_core::entities::wallet::GetWalletBalance;
use royset_core::framework::DatabaseProcessor;
use royset_sdk::api::ClaimResponse;
use royset_sdk::objects::PayoutStatus;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Build the claims router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/claims/{identity}", post(claim))
        .route("/wallets/{identity}", get(wallet))
}

/// `POST /claims/{identity}` - pay out the identity's entire pending
/// balance through the payout rail.
async fn claim(
    State(state): State<AppState>,
    Path(identity): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = state.engine.claim(identity).await?;
    Ok(Json(ClaimResponse {
        identity,
        amount: amount as i64,
    }))
}

/// Mirror view of one identity.
#[derive(Serialize)]
struct WalletView {
    identity: Uuid,
    balance: i64,
    external_address: Option<String>,
    payouts: Vec<PayoutView>,
}

#[derive(Serialize)]
struct PayoutView {
    amount: i64,
    status: PayoutStatus,
    out_of_band: bool,
    origin_reference: String,
    created_at: i64,
}

/// `GET /wallets/{identity}` - the mirrored balance and payout history.
///
/// Reads the reconciled mirror, not engine state, so the answer may trail
/// the log by the current reconciliation lag.
async fn wallet(
    State(state): State<AppState>,
    Path(identity): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let wallet = processor.process(GetWalletBalance { identity }).await?;
    let payouts = processor.process(GetPayoutsByIdentity { identity }).await?;

    Ok(Json(WalletView {
        identity,
        balance: wallet.as_ref().map(|w| w.balance).unwrap_or(0),
        external_address: wallet.and_then(|w| w.external_address),
        payouts: payouts
            .into_iter()
            .map(|p| PayoutView {
                amount: p.amount,
                status: p.status.into(),
                out_of_band: p.out_of_band,
                origin_reference: p.origin_reference,
                created_at: p.created_at,
            })
            .collect(),
    }))
}
