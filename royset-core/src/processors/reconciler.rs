//! IngestionWorker: applies settlement events to the relational mirror.
//!
//! Each event moves through Received -> Validated -> Applied, or is
//! terminally Rejected (malformed payload, quarantined with a reason) or
//! Skipped (event key already applied). Application and the dedup insert
//! share one transaction, so a crash between them is impossible and
//! re-delivery of any event is harmless.

use crate::entities::PayoutStatus;
use crate::entities::applied_event::AppliedEvent;
use crate::entities::payout::Payout;
use crate::entities::rejected_event::InsertRejectedEvent;
use crate::entities::wallet::Wallet;
use crate::events::EventReceiver;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use royset_sdk::events::{EventEnvelope, EventPayload};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Errors that can occur while ingesting an event.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Terminal state of one ingested event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    /// Mirror rows were written for this event.
    Applied,
    /// The event key was already applied; nothing was written.
    Skipped,
    /// The payload failed validation and was quarantined.
    Rejected,
}

/// One payout row to record alongside the wallet deltas.
struct PayoutEffect {
    identity: Uuid,
    amount: i64,
    status: PayoutStatus,
    out_of_band: bool,
}

/// The mirror writes one validated event expands to.
struct MirrorEffects {
    deltas: Vec<(Uuid, i64)>,
    payout: Option<PayoutEffect>,
}

/// Worker that drains settlement events into the mirror.
pub struct IngestionWorker {
    pool: SqlitePool,
    event_rx: EventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    worker_index: usize,
}

impl IngestionWorker {
    pub fn new(
        pool: SqlitePool,
        event_rx: EventReceiver,
        shutdown_rx: watch::Receiver<bool>,
        worker_index: usize,
    ) -> Self {
        Self {
            pool,
            event_rx,
            shutdown_rx,
            worker_index,
        }
    }

    /// Run the IngestionWorker until shutdown or channel close.
    pub async fn run(mut self) {
        info!(worker = self.worker_index, "IngestionWorker started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!(worker = self.worker_index, "IngestionWorker received shutdown signal");
                        break;
                    }
                }

                Some(envelope) = self.event_rx.recv() => {
                    let key = envelope.key();
                    match ingest(&self.pool, envelope).await {
                        Ok(state) => {
                            debug!(worker = self.worker_index, %key, state = ?state, "Ingested event");
                        }
                        Err(e) => {
                            // Leave the event to a later replay; the dedup
                            // key makes the retry safe.
                            error!(worker = self.worker_index, %key, error = %e, "Failed to ingest event");
                        }
                    }
                }

                else => {
                    info!(worker = self.worker_index, "Event channel closed");
                    break;
                }
            }
        }

        info!(worker = self.worker_index, "IngestionWorker shutdown complete");
    }
}

/// Apply one event to the mirror.
pub async fn ingest(
    pool: &SqlitePool,
    envelope: EventEnvelope,
) -> Result<IngestState, ReconcileError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let key = envelope.key();
    let event_type = envelope.payload.event_type();

    let effects = match validate(&envelope.payload) {
        Ok(effects) => effects,
        Err(reason) => {
            warn!(%key, event_type, reason, "Rejecting malformed event");
            let payload =
                serde_json::to_string(&envelope.payload).unwrap_or_else(|_| String::from("{}"));
            DatabaseProcessor { pool: pool.clone() }
                .process(InsertRejectedEvent {
                    origin_tx_id: envelope.origin_tx_id,
                    log_position: envelope.log_position,
                    event_type: event_type.to_string(),
                    reason,
                    payload,
                    rejected_at: now,
                })
                .await?;
            return Ok(IngestState::Rejected);
        }
    };

    let mut tx = pool.begin().await?;

    let claimed = AppliedEvent::try_claim_tx(
        &mut tx,
        envelope.origin_tx_id,
        envelope.log_position,
        event_type,
        now,
    )
    .await?;
    if !claimed {
        tx.rollback().await?;
        return Ok(IngestState::Skipped);
    }

    for (identity, delta) in &effects.deltas {
        Wallet::apply_delta_tx(&mut tx, *identity, *delta, now).await?;
    }
    if let Some(payout) = &effects.payout {
        Payout::record_tx(
            &mut tx,
            payout.identity,
            payout.amount,
            payout.status,
            payout.out_of_band,
            &key.to_string(),
            now,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(IngestState::Applied)
}

/// Check a payload's internal consistency and expand it to mirror writes.
///
/// Registration and split events carry no balance effect; they are still
/// recorded in `applied_events` so lag measurement sees every position.
fn validate(payload: &EventPayload) -> Result<MirrorEffects, String> {
    match payload {
        EventPayload::WorkRegistered { owner, .. } => {
            if owner.is_nil() {
                return Err(String::from("nil owner"));
            }
            Ok(MirrorEffects {
                deltas: Vec::new(),
                payout: None,
            })
        }
        EventPayload::SplitsUpdated {
            recipients,
            shares_bps,
            ..
        } => {
            if recipients.len() != shares_bps.len() {
                return Err(String::from("recipients and shares length mismatch"));
            }
            Ok(MirrorEffects {
                deltas: Vec::new(),
                payout: None,
            })
        }
        EventPayload::RevenueDistributed {
            total_amount,
            recipients,
            shares,
            remainder,
            remainder_recipient,
            ..
        } => {
            if *total_amount <= 0 {
                return Err(format!("non-positive total amount {total_amount}"));
            }
            if recipients.len() != shares.len() {
                return Err(String::from("recipients and shares length mismatch"));
            }
            if shares.iter().any(|s| *s < 0) || *remainder < 0 {
                return Err(String::from("negative share"));
            }
            let distributed: i64 = shares.iter().sum::<i64>() + remainder;
            if distributed != *total_amount {
                return Err(format!(
                    "shares plus remainder {distributed} do not sum to total {total_amount}"
                ));
            }

            let mut deltas: Vec<(Uuid, i64)> = recipients
                .iter()
                .zip(shares.iter())
                .filter(|(_, share)| **share > 0)
                .map(|(recipient, share)| (*recipient, *share))
                .collect();
            if *remainder > 0 {
                deltas.push((*remainder_recipient, *remainder));
            }
            Ok(MirrorEffects {
                deltas,
                payout: None,
            })
        }
        EventPayload::BalanceClaimed { identity, amount } => {
            if *amount <= 0 {
                return Err(format!("non-positive claim amount {amount}"));
            }
            Ok(MirrorEffects {
                deltas: vec![(*identity, -amount)],
                payout: Some(PayoutEffect {
                    identity: *identity,
                    amount: *amount,
                    status: PayoutStatus::Completed,
                    out_of_band: false,
                }),
            })
        }
        EventPayload::EmergencyWithdrawn { operator, amount } => {
            if *amount <= 0 {
                return Err(format!("non-positive withdrawal amount {amount}"));
            }
            // Custody withdrawals bypass per-recipient balances, so the
            // only mirror effect is the payout record itself.
            Ok(MirrorEffects {
                deltas: Vec::new(),
                payout: Some(PayoutEffect {
                    identity: *operator,
                    amount: *amount,
                    status: PayoutStatus::Completed,
                    out_of_band: true,
                }),
            })
        }
        EventPayload::PayoutFailed {
            identity,
            amount,
            out_of_band,
        } => {
            if *amount <= 0 {
                return Err(format!("non-positive payout amount {amount}"));
            }
            // The debit was rolled back at the source; the mirror keeps
            // only the failed attempt itself.
            Ok(MirrorEffects {
                deltas: Vec::new(),
                payout: Some(PayoutEffect {
                    identity: *identity,
                    amount: *amount,
                    status: PayoutStatus::Failed,
                    out_of_band: *out_of_band,
                }),
            })
        }
    }
}
