//! Royset Server
//!
//! A headless royalty split and settlement engine with a relational
//! mirror for queries.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use royset_core::SettlementEngine;
use royset_core::entities::schema;
use royset_core::events::event_channel;
use royset_core::processors::{LagMonitor, spawn_reconcilers};
use royset_core::transfer::HttpPayoutGateway;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Royset - royalty split and settlement engine
#[derive(Parser, Debug)]
#[command(name = "royset-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./royset-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the mirror database path
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting royset-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded.listen();
    tracing::info!("Configuration loaded from {:?}", args.config);

    let database_path = args
        .database
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| loaded.file.database.path.clone());

    tracing::info!(path = %database_path, "Opening mirror database");
    let connect_options = SqliteConnectOptions::new()
        .filename(&database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(loaded.file.database.max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open mirror database: {}", e);
            e
        })?;
    schema::init(&db_pool).await?;
    tracing::info!("Mirror schema ready");

    // Engine, event channel, and the reconciliation pipeline behind it.
    let (event_tx, event_rx) = event_channel();
    let gateway = Arc::new(HttpPayoutGateway::new(
        loaded.file.payout.endpoint.clone(),
        loaded.transfer_timeout(),
    ));
    let engine = Arc::new(SettlementEngine::new(
        loaded.file.engine.operator,
        gateway,
        loaded.transfer_timeout(),
        event_tx,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut worker_handles = spawn_reconcilers(
        db_pool.clone(),
        event_rx,
        shutdown_rx.clone(),
        loaded.file.reconciliation.workers,
    );
    let lag_monitor = LagMonitor::new(
        db_pool.clone(),
        engine.event_log().subscribe_head(),
        shutdown_rx,
        loaded.lag_check_interval(),
        loaded.file.reconciliation.lag_warn_threshold,
    );
    worker_handles.push(tokio::spawn(lag_monitor.run()));

    let state = AppState::new(db_pool.clone(), engine, loaded.runtime());

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the pipeline, then the reload handler, then the pool.
    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        let _ = handle.await;
    }
    reload_notify.notify_one();

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
