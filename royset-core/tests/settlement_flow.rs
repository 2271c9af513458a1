//! End-to-end settlement flow: engine mutations stream through the
//! dispatcher into the mirror, and replays leave the mirror unchanged.

use async_trait::async_trait;
use kanau::processor::Processor;
use royset_core::SettlementEngine;
use royset_core::entities::applied_event::CountAppliedEvents;
use royset_core::entities::payout::GetPayoutsByIdentity;
use royset_core::entities::schema;
use royset_core::entities::wallet::GetWalletBalance;
use royset_core::events::event_channel;
use royset_core::framework::DatabaseProcessor;
use royset_core::processors::{measure_lag, spawn_reconcilers};
use royset_core::transfer::{PayoutGateway, TransferError};
use royset_sdk::objects::PayoutRequest;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

struct AcceptingGateway;

#[async_trait]
impl PayoutGateway for AcceptingGateway {
    async fn transfer(&self, _request: PayoutRequest) -> Result<(), TransferError> {
        Ok(())
    }
}

async fn test_pool() -> SqlitePool {
    // One connection keeps every handle on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    schema::init(&pool).await.unwrap();
    pool
}

async fn balance(pool: &SqlitePool, identity: Uuid) -> i64 {
    DatabaseProcessor { pool: pool.clone() }
        .process(GetWalletBalance { identity })
        .await
        .unwrap()
        .map(|w| w.balance)
        .unwrap_or(0)
}

async fn wait_until_caught_up(pool: &SqlitePool, head: i64) {
    for _ in 0..500 {
        let lag = measure_lag(pool, head).await.unwrap();
        if lag.lag == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mirror did not catch up to position {head}");
}

#[tokio::test]
async fn settlement_flow_reaches_the_mirror() {
    let pool = test_pool().await;
    let (event_tx, event_rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let handles = spawn_reconcilers(pool.clone(), event_rx, shutdown_rx, 2);

    let engine = SettlementEngine::new(
        id(999),
        Arc::new(AcceptingGateway),
        Duration::from_millis(200),
        event_tx,
    );

    engine.register_work(id(1), id(10)).await.unwrap();
    engine
        .set_splits(id(1), id(10), vec![id(20), id(30)], vec![7000, 3000])
        .await
        .unwrap();
    engine.deposit_revenue(id(1), 100).await.unwrap();
    assert_eq!(engine.claim(id(20)).await.unwrap(), 70);

    // Positions 0..=3: registration, splits, distribution, claim.
    wait_until_caught_up(&pool, engine.event_log().head_position()).await;

    assert_eq!(balance(&pool, id(20)).await, 0);
    assert_eq!(balance(&pool, id(30)).await, 30);

    let payouts = DatabaseProcessor { pool: pool.clone() }
        .process(GetPayoutsByIdentity { identity: id(20) })
        .await
        .unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount, 70);

    shutdown_tx.send(true).unwrap();
    drop(engine);
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn full_replay_is_idempotent() {
    let pool = test_pool().await;
    let (event_tx, event_rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let handles = spawn_reconcilers(pool.clone(), event_rx, shutdown_rx, 2);

    let engine = SettlementEngine::new(
        id(999),
        Arc::new(AcceptingGateway),
        Duration::from_millis(200),
        event_tx,
    );

    engine.register_work(id(1), id(10)).await.unwrap();
    engine
        .set_splits(id(1), id(10), vec![id(20), id(30)], vec![7000, 3000])
        .await
        .unwrap();
    engine.deposit_revenue(id(1), 101).await.unwrap();
    let head = engine.event_log().head_position();
    wait_until_caught_up(&pool, head).await;

    let before_20 = balance(&pool, id(20)).await;
    let before_30 = balance(&pool, id(30)).await;
    let before_10 = balance(&pool, id(10)).await;
    assert_eq!(before_20, 70);
    assert_eq!(before_30, 30);
    assert_eq!(before_10, 1);

    // Replay the whole log twice, as a crashed consumer would request.
    assert_eq!(engine.event_log().replay_from(0).await, 3);
    assert_eq!(engine.event_log().replay_from(0).await, 3);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(balance(&pool, id(20)).await, before_20);
    assert_eq!(balance(&pool, id(30)).await, before_30);
    assert_eq!(balance(&pool, id(10)).await, before_10);

    // One applied mark per position, no matter how often events arrived.
    let applied = DatabaseProcessor { pool: pool.clone() }
        .process(CountAppliedEvents)
        .await
        .unwrap();
    assert_eq!(applied, 3);

    shutdown_tx.send(true).unwrap();
    drop(engine);
    for handle in handles {
        handle.await.unwrap();
    }
}
