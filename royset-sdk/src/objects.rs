//! Payout objects shared between the engine and external payment rails.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payout status for API responses and the relational mirror.
///
/// This is the API/DTO version without sqlx::Type. For database operations,
/// use the version in `royset-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Pending => write!(f, "pending"),
            PayoutStatus::Completed => write!(f, "completed"),
            PayoutStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Body POSTed to the external payout endpoint when a claim settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    /// Account being paid.
    pub identity: Uuid,
    /// Amount in smallest indivisible units.
    pub amount: i64,
    /// Request time, unix seconds.
    pub requested_at: i64,
    /// True for operator emergency withdrawals, false for ordinary claims.
    pub out_of_band: bool,
}
