pub mod applied_event;
pub mod payout;
pub mod rejected_event;
pub mod schema;
pub mod wallet;

use royset_sdk::objects::PayoutStatus as SdkPayoutStatus;

/// Payout status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `royset_sdk::objects::PayoutStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

impl From<PayoutStatus> for SdkPayoutStatus {
    fn from(value: PayoutStatus) -> Self {
        match value {
            PayoutStatus::Pending => SdkPayoutStatus::Pending,
            PayoutStatus::Completed => SdkPayoutStatus::Completed,
            PayoutStatus::Failed => SdkPayoutStatus::Failed,
        }
    }
}

impl From<SdkPayoutStatus> for PayoutStatus {
    fn from(value: SdkPayoutStatus) -> Self {
        match value {
            SdkPayoutStatus::Pending => PayoutStatus::Pending,
            SdkPayoutStatus::Completed => PayoutStatus::Completed,
            SdkPayoutStatus::Failed => PayoutStatus::Failed,
        }
    }
}
