mod app;
mod cache;
mod config;
mod context;
mod error;
mod handlers;
#[cfg(any(feature = "inmemory", test))]
mod mock_data;
mod queries;
mod sqlite;
mod state;
mod storage;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evently_core::storage::EventRepository;

use crate::{
    app::create_app,
    cache::{MemoCache, MemoryCache, MemoryPubSub, SqliteCache},
    config::Config,
    queries::EventQueries,
    state::AppState,
};

/// Evently - Events dashboard backed by a tag-indexed memoization cache
#[derive(Parser, Debug)]
#[command(name = "evently")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evently=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::debug!(?config, "Loaded configuration");

    // Cache: LRU memory for every producer, SQLite for persisted ones
    let memory = Arc::new(MemoryCache::new(config.cache_max_entries));
    let durable = Arc::new(SqliteCache::new(&config.cache_sqlite_path).await?);
    let cache = MemoCache::new(memory)
        .with_persistent(durable)
        .with_pubsub(Arc::new(MemoryPubSub::new()));
    let invalidation_listener = cache.spawn_invalidation_listener().await?;
    tracing::info!(
        instance_id = %cache.instance_id(),
        max_entries = config.cache_max_entries,
        durable = %config.cache_sqlite_path,
        "Cache ready"
    );

    let repository = init_repository(&config, &cache).await?;
    let queries = EventQueries::new(repository, cache.clone(), config.cache_revalidate());
    let state = AppState::new(queries, cache);

    // Build the application router
    let app = create_app(state);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = invalidation_listener {
        handle.abort();
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Builds the in-memory event store seeded with demo data.
///
/// The seeded events are new to this process, so anything the durable cache
/// remembers from a previous run is dropped.
#[cfg(feature = "inmemory")]
async fn init_repository(_config: &Config, cache: &MemoCache) -> Result<Arc<dyn EventRepository>> {
    use evently_core::cache::{
        DASHBOARD_EVENTS_TAG, DASHBOARD_RSVPS_TAG, EVENTS_TAG, EVENT_TAG,
    };

    let repository = Arc::new(storage::InMemoryRepository::new());
    mock_data::seed(repository.as_ref()).await?;
    cache
        .invalidate(&[
            DASHBOARD_EVENTS_TAG,
            DASHBOARD_RSVPS_TAG,
            EVENTS_TAG,
            EVENT_TAG,
        ])
        .await?;

    Ok(repository)
}

/// Opens the SQLite event store.
#[cfg(feature = "sqlite")]
async fn init_repository(config: &Config, _cache: &MemoCache) -> Result<Arc<dyn EventRepository>> {
    let repository = storage::SqliteRepository::new(&config.sqlite_path).await?;
    tracing::info!(path = %config.sqlite_path, "Opened SQLite event store");
    Ok(Arc::new(repository))
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
