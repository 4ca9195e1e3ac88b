//! MiniGram API server
//!
//! Wires the store of record, the cache backend and the HTTP router together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minigram::cache::{Cache, KvBackend, MemoryBackend, RedisBackend, UnavailableBackend};
use minigram::store::{MemoryStore, PgStore, RecordStore};
use minigram::{create_router, metrics, AppState, Config, MiniGram};
use minigram::{spawn_cleanup_task, spawn_warmup_task};

/// Startup sequence:
/// 1. Initialize tracing and the Prometheus recorder
/// 2. Load configuration from environment variables
/// 3. Connect the store of record (PostgreSQL, or in-memory when unset)
/// 4. Connect the cache backend (Redis, or in-memory when unset)
/// 5. Schedule the startup warm-up
/// 6. Serve HTTP until SIGINT/SIGTERM, then release connections
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minigram=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MiniGram API server");
    metrics::init_metrics();

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, instance={}, user_ttl={}s, post_ttl={}s, list_ttl={}s, stats_ttl={}s",
        config.server_port,
        config.instance_id,
        config.cache.user_ttl,
        config.cache.post_ttl,
        config.cache.list_ttl,
        config.cache.stats_ttl
    );

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(
                url,
                config.database_max_connections,
                config.database_acquire_timeout(),
            )
            .await
            .context("failed to connect to PostgreSQL")?,
        ),
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    info!("Store of record initialized: {}", store.name());

    let mut background: Vec<AbortHandle> = Vec::new();

    let backend: Arc<dyn KvBackend> = match &config.redis_url {
        Some(url) => match RedisBackend::connect(url, config.redis_timeout()).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                // Serve straight from the store rather than refusing to start
                error!(error = %e, "Redis unreachable, caching disabled");
                Arc::new(UnavailableBackend::new(e.to_string()))
            }
        },
        None => {
            warn!("REDIS_URL not set, using in-process cache");
            let memory = MemoryBackend::new();
            let cleanup = spawn_cleanup_task(memory.clone(), config.cleanup_interval);
            background.push(cleanup.abort_handle());
            Arc::new(memory)
        }
    };
    info!("Cache backend initialized: {}", backend.name());

    let cache = Cache::new(backend, config.instance_id.as_str());
    let service =
        MiniGram::new(store, cache, config.cache).with_password_cost(config.bcrypt_cost);

    background.push(
        spawn_warmup_task(service.clone(), Duration::from_secs(config.cache.warm_delay))
            .abort_handle(),
    );

    let app = create_router(AppState::new(service.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    service.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(background: Vec<AbortHandle>) {
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

    for task in &background {
        task.abort();
    }
    warn!("Background tasks aborted");
}
