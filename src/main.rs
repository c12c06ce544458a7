//! Temporal State admin server
//!
//! Runs the subsystem with its periodic cleanup and exposes the admin API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use temporal_state::api::{create_router, AppState};
use temporal_state::{spawn_cleanup_task, Config, TemporalState};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the subsystem on the wall clock and tokio timers
/// 4. Start the periodic cleanup task
/// 5. Serve the admin router until SIGINT/SIGTERM
/// 6. Abort cleanup and cancel pending unblock timers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "temporal_state=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Temporal State server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cleanup_interval={}s, event_max_age={}s, max_events={}, eviction_mode={:?}",
        config.server_port,
        config.cleanup_interval,
        config.event_max_age,
        config.max_events,
        config.eviction_mode
    );

    let app_state = AppState::from_config(&config).context("failed to build temporal state")?;
    let state = app_state.state.clone();
    info!(caches = ?state.caches().names().collect::<Vec<_>>(), "Caches registered");

    let cleanup_handle = spawn_cleanup_task(state.clone(), config.cleanup_interval());
    info!("Background cleanup task started");

    let app = create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle, state))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops background work.
async fn shutdown_signal(cleanup_handle: JoinHandle<()>, state: std::sync::Arc<TemporalState>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
    state.shutdown();
}
