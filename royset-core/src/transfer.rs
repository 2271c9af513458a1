//! Outbound payout gateway.
//!
//! `claim` debits the pending balance before it pays, so the transfer is
//! the last fallible step of the protocol and runs outside the balance
//! lock. [`PayoutGateway`] is that seam: the engine only sees a fallible
//! async call, the ledger rolls the debit back when it fails.

use async_trait::async_trait;
use royset_sdk::objects::PayoutRequest;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Errors from the external payment step. All variants are transient from
/// the caller's perspective: the debit has been rolled back and the claim
/// can be retried.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("payout request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payout endpoint rejected the transfer with status {status}")]
    Rejected { status: u16 },

    #[error("transfer timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// External payment rail invoked when a claim settles.
///
/// Implementations must be cancel-safe: the engine wraps every call in a
/// bounded timeout and treats expiry as failure.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn transfer(&self, request: PayoutRequest) -> Result<(), TransferError>;
}

/// Gateway that POSTs payout requests to an HTTP endpoint.
pub struct HttpPayoutGateway {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl HttpPayoutGateway {
    pub fn new(endpoint: Url, timeout: std::time::Duration) -> Self {
        Self {
            endpoint,
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl PayoutGateway for HttpPayoutGateway {
    async fn transfer(&self, request: PayoutRequest) -> Result<(), TransferError> {
        let identity = request.identity;
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(identity = %identity, "Payout accepted by endpoint");
            Ok(())
        } else {
            Err(TransferError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// Build a payout request stamped with the current time.
pub(crate) fn payout_request(identity: Uuid, amount: u64, out_of_band: bool) -> PayoutRequest {
    PayoutRequest {
        identity,
        // Engine amounts fit in i64: they are bounded by custodied funds,
        // which the mirror stores as i64.
        amount: amount as i64,
        requested_at: time::OffsetDateTime::now_utc().unix_timestamp(),
        out_of_band,
    }
}
