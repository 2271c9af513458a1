//! Request and response objects for the engine API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /works` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkRequest {
    pub work_id: Uuid,
    pub owner: Uuid,
}

/// `PUT /works/{work_id}/splits` body.
///
/// `recipients` and `shares_bps` are positionally aligned; the server
/// rejects the update unless the shares sum to exactly 10000 basis points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSplitsRequest {
    /// Must be the registered owner of the work.
    pub caller: Uuid,
    pub recipients: Vec<Uuid>,
    pub shares_bps: Vec<u16>,
}

/// `POST /works/{work_id}/deposits` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Amount in smallest indivisible units, must be positive.
    pub amount: i64,
}

/// One credited share within a deposit distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareBreakdown {
    pub recipient: Uuid,
    pub amount: i64,
}

/// Distribution breakdown returned from a deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResponse {
    pub work_id: Uuid,
    pub total_amount: i64,
    pub shares: Vec<ShareBreakdown>,
    pub remainder: i64,
    pub remainder_recipient: Uuid,
    /// Idempotency key of the emitted distribution event.
    pub origin_tx_id: Uuid,
    pub log_position: i64,
}

/// One entry of a work's split set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitShare {
    pub recipient: Uuid,
    pub share_bps: u16,
}

/// `GET /works/{work_id}/recipients` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientsResponse {
    pub work_id: Uuid,
    pub recipients: Vec<SplitShare>,
}

/// `POST /claims/{identity}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub identity: Uuid,
    pub amount: i64,
}

/// `POST /admin/emergency-withdraw` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyWithdrawRequest {
    pub caller: Uuid,
    pub amount: i64,
}

/// `GET /reconciliation/lag` response.
///
/// `lag` is the number of emitted events not yet folded into the mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagResponse {
    pub head_position: i64,
    pub applied_position: i64,
    pub lag: i64,
    /// True when the lag exceeds the server's configured warn threshold.
    pub lagging: bool,
}

/// Error body returned by every failing API call.
///
/// `kind` is one of the engine error kinds (`not_found`, `unauthorized`,
/// `invalid_input`, `conflict`, `insufficient_state`, `transfer_failed`,
/// `reentrant`); `retryable` is true only for transient transfer failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}
