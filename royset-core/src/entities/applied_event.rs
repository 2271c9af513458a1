use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// Dedup record for one applied event.
///
/// The primary key over (origin_tx_id, log_position) is what makes the
/// whole reconciliation pipeline idempotent: applying an event and marking
/// it applied happen in one transaction, and a replay loses the insert
/// race and is skipped.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AppliedEvent {
    pub origin_tx_id: Uuid,
    pub log_position: i64,
    pub event_type: String,
    pub applied_at: i64,
}

impl AppliedEvent {
    /// Claim an event key for application. Returns false when the key is
    /// already recorded, in which case the caller must skip the event.
    pub async fn try_claim_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        origin_tx_id: Uuid,
        log_position: i64,
        event_type: &str,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO applied_events (origin_tx_id, log_position, event_type, applied_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (origin_tx_id, log_position) DO NOTHING
            "#,
        )
        .bind(origin_tx_id)
        .bind(log_position)
        .bind(event_type)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
/// Highest log position the mirror has applied, if any.
pub struct GetAppliedHead;

impl Processor<GetAppliedHead> for DatabaseProcessor {
    type Output = Option<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAppliedHead")]
    async fn process(&self, _query: GetAppliedHead) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT MAX(log_position) FROM applied_events
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Number of events the mirror has applied.
pub struct CountAppliedEvents;

impl Processor<CountAppliedEvents> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountAppliedEvents")]
    async fn process(&self, _query: CountAppliedEvents) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM applied_events
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}
