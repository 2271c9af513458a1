use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// One mirrored pending-balance row.
///
/// `external_address` is where compliance tooling records the payout
/// destination; settlement events never carry it, so applying deltas
/// leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Wallet {
    pub identity: Uuid,
    pub balance: i64,
    pub external_address: Option<String>,
    pub updated_at: i64,
}

impl Wallet {
    /// Add `delta` to an identity's mirrored balance, creating the row on
    /// first touch. `delta` may be negative (claims and rollbacks).
    pub async fn apply_delta_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        identity: Uuid,
        delta: i64,
        now: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO wallets (identity, balance, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (identity)
            DO UPDATE SET balance = balance + $2, updated_at = $3
            "#,
        )
        .bind(identity)
        .bind(delta)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
/// Look up one identity's mirrored balance.
pub struct GetWalletBalance {
    pub identity: Uuid,
}

impl Processor<GetWalletBalance> for DatabaseProcessor {
    type Output = Option<Wallet>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWalletBalance")]
    async fn process(&self, query: GetWalletBalance) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT identity, balance, external_address, updated_at
            FROM wallets
            WHERE identity = $1
            "#,
        )
        .bind(query.identity)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// All mirrored wallets, largest balance first.
pub struct ListWallets;

impl Processor<ListWallets> for DatabaseProcessor {
    type Output = Vec<Wallet>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWallets")]
    async fn process(&self, _query: ListWallets) -> Result<Vec<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT identity, balance, external_address, updated_at
            FROM wallets
            ORDER BY balance DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
