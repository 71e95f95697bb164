#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

//! Cardex Server
//!
//! Settlement engine for gift-card trading: house buy/sell orders, a
//! peer-to-peer marketplace, and arbiter-mediated trades.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use cardex_core::config::ConfigStore;
use cardex_core::engine::SettlementEngine;
use cardex_core::events::{EventPublisher, settlement_event_channel};
use cardex_core::framework::DatabaseProcessor;
use cardex_core::processors::{ListingExpiryScheduler, NotificationDispatcher};
use cardex_core::store::{MemoryStore, SettlementStore};
use clap::Parser;
use config::runtime::SharedConfig;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Cardex - gift-card settlement server
#[derive(Parser, Debug)]
#[command(name = "cardex-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./cardex-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Keep all state in memory instead of PostgreSQL. Lost on exit.
    #[arg(long, default_value = "false", conflicts_with = "migrate")]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting cardex-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Select the store
    let db_pool = if args.ephemeral {
        tracing::warn!("Running with the in-memory store; state is lost on exit");
        None
    } else {
        Some(connect_database(args.migrate).await?)
    };
    let store: Arc<dyn SettlementStore> = match &db_pool {
        Some(pool) => Arc::new(DatabaseProcessor::new(pool.clone())),
        None => Arc::new(MemoryStore::new()),
    };

    // Create event channels
    let (event_tx, event_rx) = settlement_event_channel();
    let engine = SettlementEngine::new(store, EventPublisher::new(event_tx));

    // Shutdown signal for background tasks and long-lived connections
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn background processors
    let notification_config = ConfigStore::new(loaded_config.notifications);
    let dispatcher_handle = tokio::spawn(NotificationDispatcher::new().run(
        shutdown_rx.clone(),
        event_rx,
        notification_config.clone(),
    ));

    let expiry_handle = match loaded_config.listings {
        Some(listings) => Some(tokio::spawn(
            ListingExpiryScheduler::new(engine.clone(), listings).run(shutdown_rx.clone()),
        )),
        None => {
            tracing::info!("No [listings] section, listing expiry disabled");
            None
        }
    };

    // Create application state
    let state = AppState::new(
        engine,
        SharedConfig::new(loaded_config.admin, loaded_config.identity),
        notification_config,
        shutdown_rx,
    );

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_tx).await;

    // Signal the config reload handler to stop
    reload_notify.notify_one();

    // Wait for background processors
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "NotificationDispatcher task failed");
    }
    if let Some(handle) = expiry_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "ListingExpiryScheduler task failed");
        }
    }

    if let Some(db_pool) = db_pool {
        tracing::info!("Closing database connections...");
        db_pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(db_pool)
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
