//! The authoritative append-only event log.

use super::channels::EventSender;
use royset_sdk::events::{EventEnvelope, EventPayload};
use std::sync::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

/// Append-only sequence of settlement events.
///
/// The log is the source of truth: the relational mirror is always derived
/// from it, never the other way around. Positions are assigned here, under
/// the append lock, so that events of one work reach the channel in the
/// same order their effects were applied.
pub struct EventLog {
    events: Mutex<Vec<EventEnvelope>>,
    emit_tx: EventSender,
    head_tx: watch::Sender<i64>,
}

impl EventLog {
    /// Create an empty log that forwards appended events to `emit_tx`.
    pub fn new(emit_tx: EventSender) -> Self {
        let (head_tx, _) = watch::channel(-1i64);
        Self {
            events: Mutex::new(Vec::new()),
            emit_tx,
            head_tx,
        }
    }

    /// Append a payload, assigning its origin transaction id and position.
    ///
    /// The envelope is stored before it is forwarded, so a consumer that
    /// misses the channel send can always recover via [`replay_from`].
    ///
    /// [`replay_from`]: EventLog::replay_from
    pub async fn append(&self, payload: EventPayload) -> EventEnvelope {
        let envelope = {
            // Pushes are atomic from the log's point of view, so a
            // poisoned lock still holds a consistent Vec.
            let mut events = self.events.lock().unwrap_or_else(|p| p.into_inner());
            let envelope = EventEnvelope {
                origin_tx_id: Uuid::now_v7(),
                log_position: events.len() as i64,
                timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
                payload,
            };
            events.push(envelope.clone());
            envelope
        };

        self.head_tx.send_replace(envelope.log_position);

        if let Err(e) = self.emit_tx.send(envelope.clone()).await {
            tracing::warn!(
                position = envelope.log_position,
                error = %e,
                "Event channel closed, event retained in log only"
            );
        }

        tracing::debug!(
            event_type = envelope.payload.event_type(),
            position = envelope.log_position,
            origin_tx_id = %envelope.origin_tx_id,
            "Appended settlement event"
        );
        envelope
    }

    /// Position of the most recently appended event, -1 when empty.
    pub fn head_position(&self) -> i64 {
        *self.head_tx.borrow()
    }

    /// Subscribe to head position updates (used by the lag monitor).
    pub fn subscribe_head(&self) -> watch::Receiver<i64> {
        self.head_tx.subscribe()
    }

    /// Copy of the full log, in position order.
    pub fn snapshot(&self) -> Vec<EventEnvelope> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Re-send every event at or after `position` to the channel.
    ///
    /// Supports consumer crash recovery: re-delivery is harmless because
    /// the reconciliation pipeline skips already-applied keys. Returns the
    /// number of events re-sent.
    pub async fn replay_from(&self, position: i64) -> usize {
        let to_replay: Vec<EventEnvelope> = self
            .snapshot()
            .into_iter()
            .filter(|e| e.log_position >= position)
            .collect();

        let mut sent = 0usize;
        for envelope in to_replay {
            if self.emit_tx.send(envelope).await.is_err() {
                break;
            }
            sent += 1;
        }
        tracing::info!(from = position, count = sent, "Replayed settlement events");
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[tokio::test]
    async fn positions_are_dense_and_ordered() {
        let (tx, mut rx) = event_channel();
        let log = EventLog::new(tx);

        for i in 0..3u128 {
            let envelope = log
                .append(EventPayload::WorkRegistered {
                    work_id: Uuid::from_u128(i),
                    owner: Uuid::from_u128(100 + i),
                })
                .await;
            assert_eq!(envelope.log_position, i as i64);
        }
        assert_eq!(log.head_position(), 2);

        for i in 0..3i64 {
            let received = rx.recv().await.expect("event");
            assert_eq!(received.log_position, i);
        }
    }

    #[tokio::test]
    async fn replay_resends_from_position() {
        let (tx, mut rx) = event_channel();
        let log = EventLog::new(tx);

        for i in 0..4u128 {
            log.append(EventPayload::WorkRegistered {
                work_id: Uuid::from_u128(i),
                owner: Uuid::from_u128(1),
            })
            .await;
        }
        // Drain the original deliveries.
        for _ in 0..4 {
            rx.recv().await.expect("event");
        }

        let sent = log.replay_from(2).await;
        assert_eq!(sent, 2);
        assert_eq!(rx.recv().await.expect("event").log_position, 2);
        assert_eq!(rx.recv().await.expect("event").log_position, 3);
    }
}
