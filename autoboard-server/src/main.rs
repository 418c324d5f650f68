//! Autoboard Server
//!
//! Publishes car ads to a Telegram channel and keeps the channel posts in
//! step with each ad's tariff and status.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use autoboard_core::engine::AdEngine;
use autoboard_core::events::unpin_armed_channel;
use autoboard_core::framework::DatabaseProcessor;
use autoboard_core::media::LocalMediaResolver;
use autoboard_core::processors::{
    ChannelPublisher, StatusSynchronizer, UnpinScheduler, UnpinSweeper,
};
use autoboard_core::telegram::{ChannelId, MessagingGateway, TelegramBotApi};
use autoboard_core::utils::clock::{Clock, SystemClock};
use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Autoboard - Telegram car ad publication service
#[derive(Parser, Debug)]
#[command(name = "autoboard-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./autoboard-config.toml", env = "AUTOBOARD_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting autoboard-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
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

    // Run migrations if requested
    if args.migrate {
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

    // Wire the engine
    let store = Arc::new(DatabaseProcessor::new(db_pool.clone()));
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramBotApi::new(
        config.telegram.bot_token.clone(),
        config.telegram.api_base_url.clone(),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let channel = ChannelId::new(config.telegram.channel_id.clone());
    let (armed_tx, armed_rx) = unpin_armed_channel();

    let scheduler = UnpinScheduler::new(store.clone(), channel.clone(), armed_tx);
    let publisher = ChannelPublisher::new(
        gateway.clone(),
        channel.clone(),
        config.telegram.submit_url.as_str(),
        scheduler,
        clock.clone(),
    );
    let synchronizer = StatusSynchronizer::new(
        store.clone(),
        gateway.clone(),
        channel.clone(),
        publisher.keyboard().clone(),
    );
    let media = Arc::new(LocalMediaResolver::new(config.media.upload_dir.clone()));
    let engine = AdEngine::new(store.clone(), media, publisher, synchronizer);
    tracing::info!(channel = %channel, "Publication engine ready");

    // Spawn the unpin sweeper
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = UnpinSweeper::new(store, gateway, clock)
        .with_interval(std::time::Duration::from_secs(
            config.scheduler.sweep_interval_secs,
        ))
        .with_batch_size(config.scheduler.batch_size);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx, armed_rx));

    // Build the router
    let router = build_router(AppState::new(engine));

    // Run the server
    let listen_addr = config.server.listen;
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background processors
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        tracing::error!("Unpin sweeper task failed: {}", e);
    }

    // Close database connections gracefully
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
