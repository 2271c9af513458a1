//! The authoritative settlement event schema.
//!
//! Every state change in the engine emits exactly one [`EventEnvelope`].
//! Envelopes are immutable once emitted and may be delivered to consumers
//! more than once; the `(origin_tx_id, log_position)` pair is the
//! idempotency key that lets consumers absorb replays.
//!
//! Amounts are carried as `i64` on the wire even though the engine only
//! produces non-negative values. Consumers must validate the sign rather
//! than trust the producer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Idempotency key of one logical event.
///
/// Globally unique per event: `origin_tx_id` identifies the mutating call
/// that produced the event, `log_position` its ordinal in the append-only
/// log. Rendered with [`Display`](std::fmt::Display) it doubles as the
/// `origin_reference` column of the relational mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub origin_tx_id: Uuid,
    pub log_position: i64,
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.origin_tx_id, self.log_position)
    }
}

/// Body of a settlement event, tagged by `event_type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A new work was registered with its owning account.
    WorkRegistered { work_id: Uuid, owner: Uuid },
    /// The split set of a work was atomically replaced.
    SplitsUpdated {
        work_id: Uuid,
        recipients: Vec<Uuid>,
        shares_bps: Vec<u16>,
    },
    /// One deposit was distributed across the current split set.
    ///
    /// `shares` is positionally aligned with `recipients`. The rounding
    /// remainder goes entirely to `remainder_recipient` (the work owner at
    /// distribution time), so `total_amount == shares.sum() + remainder`
    /// always holds for well-formed events.
    RevenueDistributed {
        work_id: Uuid,
        total_amount: i64,
        recipients: Vec<Uuid>,
        shares: Vec<i64>,
        remainder: i64,
        remainder_recipient: Uuid,
    },
    /// A recipient withdrew their entire pending balance.
    BalanceClaimed { identity: Uuid, amount: i64 },
    /// Out-of-band administrative withdrawal of custodied funds.
    ///
    /// Distinct from ordinary claims: it never touches per-recipient
    /// pending balances and must stand out in the audit trail.
    EmergencyWithdrawn { operator: Uuid, amount: i64 },
    /// A settlement whose external transfer failed after the debit was
    /// rolled back. Carries no balance effect; it exists so the mirror
    /// records the failed attempt for reconciliation.
    PayoutFailed {
        identity: Uuid,
        amount: i64,
        out_of_band: bool,
    },
}

impl EventPayload {
    /// Wire name of the event type, matching the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::WorkRegistered { .. } => "work_registered",
            EventPayload::SplitsUpdated { .. } => "splits_updated",
            EventPayload::RevenueDistributed { .. } => "revenue_distributed",
            EventPayload::BalanceClaimed { .. } => "balance_claimed",
            EventPayload::EmergencyWithdrawn { .. } => "emergency_withdrawn",
            EventPayload::PayoutFailed { .. } => "payout_failed",
        }
    }

    /// The work this event belongs to, if any.
    pub fn work_id(&self) -> Option<Uuid> {
        match self {
            EventPayload::WorkRegistered { work_id, .. }
            | EventPayload::SplitsUpdated { work_id, .. }
            | EventPayload::RevenueDistributed { work_id, .. } => Some(*work_id),
            EventPayload::BalanceClaimed { .. }
            | EventPayload::EmergencyWithdrawn { .. }
            | EventPayload::PayoutFailed { .. } => None,
        }
    }

    /// Key used to route events to ingestion workers.
    ///
    /// Events of the same work must be ingested in log order; events
    /// without a work are keyed by the affected identity instead.
    pub fn routing_key(&self) -> Uuid {
        match self {
            EventPayload::WorkRegistered { work_id, .. }
            | EventPayload::SplitsUpdated { work_id, .. }
            | EventPayload::RevenueDistributed { work_id, .. } => *work_id,
            EventPayload::BalanceClaimed { identity, .. }
            | EventPayload::PayoutFailed { identity, .. } => *identity,
            EventPayload::EmergencyWithdrawn { operator, .. } => *operator,
        }
    }
}

/// A settlement event as it appears in the authoritative log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Identity of the mutating call that produced this event.
    pub origin_tx_id: Uuid,
    /// Position in the append-only log, assigned by the emitter.
    pub log_position: i64,
    /// Emission time, unix seconds.
    pub timestamp: i64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventEnvelope {
    /// The de-duplication key of this event.
    pub fn key(&self) -> EventKey {
        EventKey {
            origin_tx_id: self.origin_tx_id,
            log_position: self.log_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope {
            origin_tx_id: Uuid::from_u128(7),
            log_position: 3,
            timestamp: 1_700_000_000,
            payload: EventPayload::RevenueDistributed {
                work_id: Uuid::from_u128(1),
                total_amount: 100,
                recipients: vec![Uuid::from_u128(2), Uuid::from_u128(3)],
                shares: vec![70, 30],
                remainder: 0,
                remainder_recipient: Uuid::from_u128(4),
            },
        }
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = sample_envelope();
        let json = serde_json::to_string(&envelope).expect("serialize");
        assert!(json.contains("\"event_type\":\"revenue_distributed\""));
        let parsed: EventEnvelope = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn key_display_is_stable() {
        let key = sample_envelope().key();
        assert_eq!(
            key.to_string(),
            "00000000-0000-0000-0000-000000000007#3"
        );
    }

    #[test]
    fn routing_key_prefers_work_id() {
        let envelope = sample_envelope();
        assert_eq!(envelope.payload.routing_key(), Uuid::from_u128(1));

        let claim = EventPayload::BalanceClaimed {
            identity: Uuid::from_u128(9),
            amount: 5,
        };
        assert_eq!(claim.routing_key(), Uuid::from_u128(9));
        assert_eq!(claim.work_id(), None);
    }
}
