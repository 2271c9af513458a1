use crate::entities::PayoutStatus;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// One mirrored payout row. `origin_reference` is the event key of the
/// claim or withdrawal event that produced it, so replays collide on the
/// unique index instead of double-recording.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Payout {
    pub id: i64,
    pub identity: Uuid,
    pub amount: i64,
    pub status: PayoutStatus,
    pub out_of_band: bool,
    pub origin_reference: String,
    pub created_at: i64,
}

impl Payout {
    /// Record a payout attempt with its terminal status. Returns false when
    /// the origin reference is already recorded (replayed event).
    pub async fn record_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        identity: Uuid,
        amount: i64,
        status: PayoutStatus,
        out_of_band: bool,
        origin_reference: &str,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO payouts (identity, amount, status, out_of_band, origin_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (origin_reference) DO NOTHING
            "#,
        )
        .bind(identity)
        .bind(amount)
        .bind(status)
        .bind(out_of_band)
        .bind(origin_reference)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
/// Payout history of one identity, most recent first.
pub struct GetPayoutsByIdentity {
    pub identity: Uuid,
}

impl Processor<GetPayoutsByIdentity> for DatabaseProcessor {
    type Output = Vec<Payout>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPayoutsByIdentity")]
    async fn process(&self, query: GetPayoutsByIdentity) -> Result<Vec<Payout>, sqlx::Error> {
        sqlx::query_as::<_, Payout>(
            r#"
            SELECT id, identity, amount, status, out_of_band, origin_reference, created_at
            FROM payouts
            WHERE identity = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(query.identity)
        .fetch_all(&self.pool)
        .await
    }
}
