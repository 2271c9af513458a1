//! Embedded mirror schema.
//!
//! The mirror is disposable: it can always be rebuilt by replaying the
//! event log, so the schema ships with the binary instead of a migration
//! toolchain.

use sqlx::SqlitePool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    identity          BLOB PRIMARY KEY,
    balance           INTEGER NOT NULL DEFAULT 0,
    external_address  TEXT,
    updated_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS payouts (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    identity          BLOB NOT NULL,
    amount            INTEGER NOT NULL,
    status            TEXT NOT NULL DEFAULT 'pending',
    out_of_band       INTEGER NOT NULL DEFAULT 0,
    origin_reference  TEXT NOT NULL UNIQUE,
    created_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS applied_events (
    origin_tx_id  BLOB NOT NULL,
    log_position  INTEGER NOT NULL,
    event_type    TEXT NOT NULL,
    applied_at    INTEGER NOT NULL,
    PRIMARY KEY (origin_tx_id, log_position)
);

CREATE TABLE IF NOT EXISTS rejected_events (
    origin_tx_id  BLOB NOT NULL,
    log_position  INTEGER NOT NULL,
    event_type    TEXT NOT NULL,
    reason        TEXT NOT NULL,
    payload       TEXT NOT NULL,
    rejected_at   INTEGER NOT NULL,
    PRIMARY KEY (origin_tx_id, log_position)
);

CREATE INDEX IF NOT EXISTS idx_payouts_identity ON payouts (identity);
CREATE INDEX IF NOT EXISTS idx_applied_events_position ON applied_events (log_position);
"#;

/// Create the mirror tables if they do not exist yet.
#[tracing::instrument(skip_all, err, name = "SQL:InitSchema")]
pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
