//! Election result collector (tally-collector) - Main entry point
//!
//! Polls the source catalog on the election-day schedule, reconciles what the
//! sources report into canonical constituency results, and serves the admin
//! HTTP API plus an SSE change stream.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tally_common::catalog::seed_constituencies;
use tally_common::config::{load_or_default, resolve_root_folder, ROOT_FOLDER_ENV};
use tally_common::db::{init_database, DATABASE_FILE};
use tally_common::events::EventBus;
use tally_collector::config::resolve_search_api_key;
use tally_collector::extract::{SearchAnswerClient, TextExtractor, UnconfiguredExtractor};
use tally_collector::store::{ElectionStore, SqliteStore};
use tally_collector::{build_router, AppState, ServiceSettings};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EVENT_BUS_CAPACITY: usize = 1000;

/// Command-line arguments for tally-collector
#[derive(Parser, Debug)]
#[command(name = "tally-collector")]
#[command(about = "Election result collection and reconciliation service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config (defaults to the platform config dir)
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the SQLite database
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<String>,

    /// Port to listen on (overrides the TOML config)
    #[arg(short, long, env = "TALLY_PORT")]
    port: Option<u16>,

    /// Start collecting as soon as the server is up
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let default_filter = format!(
        "tally_collector={level},tally_common={level},tower_http=info",
        level = toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = args.port.unwrap_or(toml_config.port);
    info!("Starting tally-collector on port {}", port);

    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
        &toml_config,
    );
    info!("Root folder: {}", root_folder.display());

    let pool = init_database(&root_folder.join(DATABASE_FILE))
        .await
        .context("Failed to initialize database")?;

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let store: Arc<dyn ElectionStore> = Arc::new(SqliteStore::new(pool, event_bus.clone()));

    if store
        .constituencies()
        .await
        .context("Failed to read constituencies")?
        .is_empty()
    {
        let records = seed_constituencies();
        store
            .seed_constituencies(&records)
            .await
            .context("Failed to seed constituencies")?;
        info!(count = records.len(), "Seeded constituency catalog");
    }

    let extractor: Arc<dyn TextExtractor> = match resolve_search_api_key(&toml_config) {
        Ok(key) => Arc::new(
            SearchAnswerClient::new(key, &toml_config.search)
                .context("Failed to build search client")?,
        ),
        Err(e) => {
            warn!("{}. Collection will log every fetch as failed.", e);
            Arc::new(UnconfiguredExtractor::new(e.to_string()))
        }
    };

    let state = AppState::new(
        store,
        event_bus,
        extractor,
        ServiceSettings::from_config(&toml_config),
    );

    if args.autostart || toml_config.collector.autostart {
        state
            .scheduler
            .start()
            .await
            .context("Failed to start collection")?;
    }

    let scheduler = Arc::clone(&state.scheduler);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = scheduler.stop().await {
        warn!("Failed to record collection stop: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
