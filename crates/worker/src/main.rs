use std::sync::Arc;

use anyhow::Context;
use superres_core::upscaler::ResizeUpscaler;
use superres_db::PgAuditLog;
use superres_events::{EventBus, RedisStore};
use superres_pipeline::{retention, JobManager};
use superres_worker::config::{LogFormat, WorkerConfig, DEFAULT_LOG_FILTER};
use superres_worker::error::StartupError;
use superres_worker::intake;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        grid_rows = config.pipeline.grid.rows(),
        grid_cols = config.pipeline.grid.cols(),
        upscale = config.upscale_factor,
        max_concurrent_jobs = config.pipeline.max_concurrent_jobs,
        max_queued_jobs = config.pipeline.max_queued_jobs,
        job_retention_secs = config.pipeline.job_retention.as_secs(),
        "Loaded worker configuration"
    );

    // --- Durable store ---
    let store = RedisStore::connect(&config.redis_url)
        .await
        .map_err(|e| StartupError::StoreConnect(e.to_string()))?;
    tracing::info!("Redis connection established");

    // --- Database ---
    let pool = superres_db::create_pool(&config.database_url)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    superres_db::health_check(&pool)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    superres_db::run_migrations(&pool)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    tracing::info!("Database ready, migrations applied");

    // --- Model ---
    let upscaler = ResizeUpscaler::new(config.upscale_factor)
        .map_err(|e| StartupError::ModelLoad(e.to_string()))?;
    tracing::info!(factor = config.upscale_factor, "Upscaler loaded");

    // --- Pipeline ---
    let manager = JobManager::new(
        config.pipeline.clone(),
        Arc::new(upscaler),
        Arc::new(store.clone()),
        Arc::new(PgAuditLog::new(pool)),
        Arc::new(EventBus::default()),
    )
    .context("Invalid pipeline configuration")?;

    // --- Background ---
    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(retention::run(
        Arc::clone(&manager),
        config.pipeline.job_retention,
        config.pipeline.retention_sweep,
        cancel.clone(),
    ));

    // --- Intake ---
    let requests = store
        .subscribe(&config.request_channel)
        .await
        .map_err(|e| StartupError::StoreConnect(e.to_string()))?;
    tracing::info!(channel = %config.request_channel, "Listening for upscale requests");

    tokio::select! {
        _ = intake::run(Arc::clone(&manager), requests) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
    }

    // --- Drain ---
    tracing::info!(tracked_jobs = manager.list().len(), "Waiting for running jobs");
    manager.shutdown().await;
    cancel.cancel();
    if let Err(e) = sweep.await {
        tracing::error!(error = %e, "Retention sweep ended abnormally");
    }
    tracing::info!("Worker stopped");

    Ok(())
}
