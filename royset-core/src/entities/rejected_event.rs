use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// Quarantine record for an event the reconciler refused to apply.
///
/// Rejected events are kept with their raw payload so an operator can
/// inspect and, after a fix, replay them from the log. Keyed by event
/// key, so a re-delivered rejection collides instead of duplicating.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RejectedEvent {
    pub origin_tx_id: Uuid,
    pub log_position: i64,
    pub event_type: String,
    pub reason: String,
    pub payload: String,
    pub rejected_at: i64,
}

#[derive(Debug, Clone)]
/// Quarantine one malformed event. Idempotent on the event key.
pub struct InsertRejectedEvent {
    pub origin_tx_id: Uuid,
    pub log_position: i64,
    pub event_type: String,
    pub reason: String,
    pub payload: String,
    pub rejected_at: i64,
}

impl Processor<InsertRejectedEvent> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertRejectedEvent")]
    async fn process(&self, insert: InsertRejectedEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO rejected_events
                (origin_tx_id, log_position, event_type, reason, payload, rejected_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (origin_tx_id, log_position) DO NOTHING
            "#,
        )
        .bind(insert.origin_tx_id)
        .bind(insert.log_position)
        .bind(insert.event_type)
        .bind(insert.reason)
        .bind(insert.payload)
        .bind(insert.rejected_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
/// All quarantined events, oldest first.
pub struct ListRejectedEvents;

impl Processor<ListRejectedEvents> for DatabaseProcessor {
    type Output = Vec<RejectedEvent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListRejectedEvents")]
    async fn process(&self, _query: ListRejectedEvents) -> Result<Vec<RejectedEvent>, sqlx::Error> {
        sqlx::query_as::<_, RejectedEvent>(
            r#"
            SELECT origin_tx_id, log_position, event_type, reason, payload, rejected_at
            FROM rejected_events
            ORDER BY log_position ASC, rejected_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
