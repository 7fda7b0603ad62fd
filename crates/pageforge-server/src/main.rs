//! `PageForge` server entry point.
//!
//! Bootstraps the storage backend and application state, then starts the
//! Axum HTTP server with graceful shutdown. A background session sweeper
//! runs alongside the server and is cancelled on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use pageforge_core::session::SessionStore;
use pageforge_storage::{FileBackend, MemoryBackend, StorageBackend};

use pageforge_server::config::{ServerConfig, StorageBackendType};
use pageforge_server::routes;
use pageforge_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, "PageForge starting");

    let storage = open_storage(&config)?;
    let state = Arc::new(AppState::new(&storage, &config));
    state
        .bootstrap()
        .await
        .context("failed to write bootstrap files")?;

    // Shutdown signal channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn session sweeper background worker.
    let sweeper_handle = {
        let sessions = Arc::clone(&state.sessions);
        let mut rx = shutdown_rx.clone();
        let interval = config.session_sweep_interval;
        tokio::spawn(async move {
            session_sweeper(sessions, &mut rx, interval).await;
        })
    };

    let app = routes::router(state);

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "PageForge server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    // Wait for the sweeper to finish (with timeout).
    info!("waiting for background workers to stop");
    let _ = tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await;

    info!("PageForge server stopped");
    Ok(())
}

/// Open the configured storage backend.
fn open_storage(config: &ServerConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    let storage: Arc<dyn StorageBackend> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryBackend::new())
        }
        StorageBackendType::File { path } => {
            info!(path = %path.display(), "using file storage");
            Arc::new(FileBackend::open(path).context("failed to open data directory")?)
        }
    };
    Ok(storage)
}

/// Background worker that periodically removes expired sessions.
async fn session_sweeper(
    sessions: Arc<SessionStore>,
    shutdown: &mut watch::Receiver<bool>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    info!(interval_secs = period.as_secs(), "session sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = sessions.purge_expired().await;
                if purged > 0 {
                    info!(purged, "expired sessions removed");
                } else {
                    debug!("no expired sessions");
                }
            }
            _ = shutdown.changed() => {
                info!("session sweeper shutting down");
                return;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
