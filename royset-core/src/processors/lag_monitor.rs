//! LagMonitor: measures how far the mirror trails the event log.
//!
//! Lag is the distance between the log head position and the highest
//! position recorded in `applied_events`. A healthy pipeline keeps it
//! near zero; a growing number means workers are stuck or the mirror is
//! rejecting events.

use crate::entities::applied_event::GetAppliedHead;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct LagMonitor {
    pool: SqlitePool,
    head_rx: watch::Receiver<i64>,
    shutdown_rx: watch::Receiver<bool>,
    interval: Duration,
    warn_threshold: i64,
}

impl LagMonitor {
    pub fn new(
        pool: SqlitePool,
        head_rx: watch::Receiver<i64>,
        shutdown_rx: watch::Receiver<bool>,
        interval: Duration,
        warn_threshold: i64,
    ) -> Self {
        Self {
            pool,
            head_rx,
            shutdown_rx,
            interval,
            warn_threshold,
        }
    }

    /// Run the LagMonitor until shutdown.
    pub async fn run(mut self) {
        info!(interval = ?self.interval, "LagMonitor started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("LagMonitor received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.interval) => {
                    let head_position = *self.head_rx.borrow();
                    match measure_lag(&self.pool, head_position).await {
                        Ok(lag) => {
                            if lag.lag > self.warn_threshold {
                                warn!(
                                    head = lag.head_position,
                                    applied = lag.applied_position,
                                    lag = lag.lag,
                                    "Reconciliation lag above threshold"
                                );
                            } else {
                                info!(
                                    head = lag.head_position,
                                    applied = lag.applied_position,
                                    lag = lag.lag,
                                    "Reconciliation lag"
                                );
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to measure reconciliation lag");
                        }
                    }
                }
            }
        }

        info!("LagMonitor shutdown complete");
    }
}

/// One lag observation. Positions are -1 while the respective side is
/// still empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagObservation {
    pub head_position: i64,
    pub applied_position: i64,
    pub lag: i64,
}

/// Compare the log head with the mirror's applied head.
pub async fn measure_lag(
    pool: &SqlitePool,
    head_position: i64,
) -> Result<LagObservation, sqlx::Error> {
    let applied_position = DatabaseProcessor { pool: pool.clone() }
        .process(GetAppliedHead)
        .await?
        .unwrap_or(-1);
    Ok(LagObservation {
        head_position,
        applied_position,
        lag: (head_position - applied_position).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::schema;
    use crate::processors::reconciler::ingest;
    use royset_sdk::events::{EventEnvelope, EventPayload};
    use sqlx::sqlite::SqlitePoolOptions;
    use uuid::Uuid;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        schema::init(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn lag_tracks_applied_positions() {
        let pool = test_pool().await;

        let lag = measure_lag(&pool, 4).await.unwrap();
        assert_eq!(lag.applied_position, -1);
        assert_eq!(lag.lag, 5);

        for position in 0..3 {
            ingest(
                &pool,
                EventEnvelope {
                    origin_tx_id: Uuid::now_v7(),
                    log_position: position,
                    timestamp: 1_700_000_000,
                    payload: EventPayload::WorkRegistered {
                        work_id: Uuid::from_u128(1),
                        owner: Uuid::from_u128(10),
                    },
                },
            )
            .await
            .unwrap();
        }

        let lag = measure_lag(&pool, 4).await.unwrap();
        assert_eq!(lag.applied_position, 2);
        assert_eq!(lag.lag, 2);

        let lag = measure_lag(&pool, 2).await.unwrap();
        assert_eq!(lag.lag, 0);
    }
}
