//! Durable Cache server binary
//!
//! Serves the cache over HTTP with the persistence side channel wired in.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use durable_cache::config::{EnvSource, ListenerCatalog};
use durable_cache::persistence::{FileSolver, MemorySolver, SolverKind};
use durable_cache::{
    create_router, run_recovery, spawn_cleanup_task, spawn_persistence_worker, AppState,
    CacheConfiguration, Config, ExpirationPipeline, SolverRegistry,
};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load server settings and seal the cache configuration from the environment
/// 3. Bind the declared expiration and recovery listeners
/// 4. Build the solver registry, store and decorated command surface
/// 5. Install the expiration pipeline and replay the durable store
/// 6. Start the cleanup task (and the persistence worker in async mode or
///    with the file solver)
/// 7. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "durable_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Durable Cache Server");

    let config = Config::from_env();
    let cache_config = Arc::new(CacheConfiguration::builder().seal(&EnvSource::default()));
    info!(
        "Configuration loaded: port={}, cleanup_interval={}s, {:?}",
        config.server_port, config.cleanup_interval, cache_config
    );

    ListenerCatalog::builtin()
        .bind(
            &cache_config,
            &config.expiration_listeners,
            &config.recovery_listeners,
        )
        .context("Failed to bind listeners")?;

    let mut registry = SolverRegistry::new().with(SolverKind::Memory, Arc::new(MemorySolver::new()));
    if cache_config.solver() == SolverKind::File {
        let solver = FileSolver::open(&config.data_dir).with_context(|| {
            format!("Failed to open snapshot in {}", config.data_dir.display())
        })?;
        registry.register(SolverKind::File, Arc::new(solver));
    }
    let registry = Arc::new(registry);

    // File snapshots block, so they always go through the worker.
    let (queue, worker_handle) = if cache_config.persists_off_thread() {
        let (queue, handle) = spawn_persistence_worker(registry.clone());
        info!("Persistence worker started");
        (Some(queue), Some(handle))
    } else {
        (None, None)
    };

    let mut pipeline = ExpirationPipeline::new(cache_config.clone(), registry.clone());
    if let Some(queue) = &queue {
        pipeline = pipeline.with_queue(queue.clone());
    }
    let state = AppState::from_config(cache_config.clone(), registry.clone(), queue);
    state.store.set_expiration_callback(Arc::new(pipeline));

    if let Err(err) = run_recovery(&cache_config, &registry, &state.store) {
        warn!("Recovery skipped: {}", err);
    }

    let cleanup_handle = spawn_cleanup_task(state.store.clone(), config.cleanup_interval);
    info!("Background cleanup task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("Server error")?;

    // Pending jobs drain once the router and the cleanup task drop the last queue handles.
    if let Some(handle) = worker_handle {
        if let Err(err) = handle.await {
            warn!("Persistence worker ended abnormally: {}", err);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the cleanup task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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
}
