//! Dispatcher: fans settlement events out to a pool of ingestion workers.
//!
//! Routing is by hash of the event's routing key (the work id where one
//! exists, the affected identity otherwise), so all events of one work
//! land on the same worker and are applied in log order. Events of
//! different works may be applied out of order relative to each other.

use crate::events::{event_channel, EventReceiver, EventSender};
use crate::processors::reconciler::IngestionWorker;
use sqlx::SqlitePool;
use std::hash::{BuildHasher, Hasher, RandomState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Dispatcher that shards events across ingestion workers.
pub struct Dispatcher {
    event_rx: EventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    worker_txs: Vec<EventSender>,
    hasher: RandomState,
}

impl Dispatcher {
    /// Run the Dispatcher until shutdown or channel close. Dropping the
    /// worker senders on exit lets the workers drain and stop.
    pub async fn run(mut self) {
        info!(workers = self.worker_txs.len(), "Dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }

                Some(envelope) = self.event_rx.recv() => {
                    let mut hasher = self.hasher.build_hasher();
                    hasher.write(envelope.payload.routing_key().as_bytes());
                    let index = (hasher.finish() as usize) % self.worker_txs.len();
                    if self.worker_txs[index].send(envelope).await.is_err() {
                        warn!(worker = index, "Worker channel closed, stopping dispatch");
                        break;
                    }
                }

                else => {
                    info!("Event channel closed");
                    break;
                }
            }
        }

        info!("Dispatcher shutdown complete");
    }
}

/// Spawn `workers` ingestion workers plus the dispatcher feeding them.
///
/// Returns the join handles, dispatcher first.
pub fn spawn_reconcilers(
    pool: SqlitePool,
    event_rx: EventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    let workers = workers.max(1);
    let mut handles = Vec::with_capacity(workers + 1);
    let mut worker_txs = Vec::with_capacity(workers);

    for index in 0..workers {
        let (tx, rx) = event_channel();
        worker_txs.push(tx);
        let worker = IngestionWorker::new(pool.clone(), rx, shutdown_rx.clone(), index);
        handles.push(tokio::spawn(worker.run()));
    }

    let dispatcher = Dispatcher {
        event_rx,
        shutdown_rx,
        worker_txs,
        hasher: RandomState::new(),
    };
    handles.insert(0, tokio::spawn(dispatcher.run()));
    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use royset_sdk::events::{EventEnvelope, EventPayload};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn deposit_event(position: i64, work_id: Uuid) -> EventEnvelope {
        EventEnvelope {
            origin_tx_id: Uuid::now_v7(),
            log_position: position,
            timestamp: 1_700_000_000,
            payload: EventPayload::RevenueDistributed {
                work_id,
                total_amount: 10,
                recipients: vec![id(20)],
                shares: vec![10],
                remainder: 0,
                remainder_recipient: work_id,
            },
        }
    }

    #[tokio::test]
    async fn same_work_events_stay_on_one_worker_in_log_order() {
        let (event_tx, event_rx) = event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut worker_txs = Vec::new();
        let mut worker_rxs = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = event_channel();
            worker_txs.push(tx);
            worker_rxs.push(rx);
        }
        let dispatcher = Dispatcher {
            event_rx,
            shutdown_rx,
            worker_txs,
            hasher: RandomState::new(),
        };
        let handle = tokio::spawn(dispatcher.run());

        // Interleave three works so every worker sees contention.
        for position in 0..120i64 {
            let work_id = id((position % 3) as u128 + 1);
            event_tx
                .send(deposit_event(position, work_id))
                .await
                .unwrap();
        }

        // Per routing key: the worker that first saw it, and the positions
        // in arrival order.
        let mut seen: HashMap<Uuid, (usize, Vec<i64>)> = HashMap::new();
        let mut total = 0usize;
        while total < 120 {
            for (worker, rx) in worker_rxs.iter_mut().enumerate() {
                while let Ok(envelope) = rx.try_recv() {
                    let entry = seen
                        .entry(envelope.payload.routing_key())
                        .or_insert((worker, Vec::new()));
                    assert_eq!(entry.0, worker, "one work split across workers");
                    entry.1.push(envelope.log_position);
                    total += 1;
                }
            }
            tokio::task::yield_now().await;
        }
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        for (_, positions) in seen.values() {
            assert!(
                positions.windows(2).all(|pair| pair[0] < pair[1]),
                "positions delivered out of log order: {positions:?}"
            );
        }
    }
}
