//! Coursebook Server: course seat reservation service.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use coursebook_api::{AppState, build_app};
use coursebook_cache::CacheManager;
use coursebook_core::config::AppConfig;
use coursebook_database::memory::memory_stores;
use coursebook_database::migration::run_migrations;
use coursebook_database::repositories::postgres_stores;
use coursebook_database::{DatabasePool, Stores};
use coursebook_service::RetryPolicy;
use coursebook_worker::{HoldReconciler, ReconcileScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("COURSEBOOK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("failed to load configuration")?;

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    run(config).await
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Coursebook v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // Cache
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(
        CacheManager::new(&config.cache)
            .await
            .context("cache initialization failed")?,
    );

    // Store backend
    let (stores, pool) = build_stores(&config, &cache).await?;

    // Hold reconciliation
    let scheduler = if config.worker.enabled {
        let reconciler = Arc::new(HoldReconciler::new(
            &stores,
            &config.worker,
            RetryPolicy::from(&config.reservation.release),
        ));
        let scheduler = ReconcileScheduler::new(
            reconciler,
            Duration::from_secs(config.worker.reconcile_interval_seconds),
        )
        .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Hold reconciliation disabled");
        None
    };

    // HTTP server
    let state = AppState::new(Arc::clone(&config), stores.clone(), cache);
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Coursebook server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, draining connections");
        let _ = shutdown_tx.send(true);
    });
    let mut server = tokio::spawn(async move { serve.await });

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    tokio::select! {
        result = &mut server => {
            result.context("server task panicked")?.context("server error")?;
        }
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, aborting open connections");
            server.abort();
        }
    }

    // Teardown
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Failed to stop reconcile scheduler");
        }
    }
    stores.clear().await;
    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Coursebook server stopped");
    Ok(())
}

/// Build the configured store backend, running migrations for PostgreSQL.
async fn build_stores(
    config: &AppConfig,
    cache: &Arc<CacheManager>,
) -> anyhow::Result<(Stores, Option<DatabasePool>)> {
    if !config.store.is_postgres() {
        tracing::info!("Using in-memory stores");
        return Ok((memory_stores(), None));
    }

    tracing::info!("Connecting to database");
    let pool = DatabasePool::connect(&config.database)
        .await
        .context("database connection failed")?;
    run_migrations(pool.pool())
        .await
        .context("database migration failed")?;

    let stores = postgres_stores(pool.pool().clone(), CacheManager::clone(cache));
    Ok((stores, Some(pool)))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
