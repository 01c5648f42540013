//! Relational audit store for super-resolution jobs.
//!
//! One `upscale_tasks` row per job name, written at submission and
//! updated when the job completes or fails. [`PgAuditLog`] adapts the
//! repository to the pipeline's [`AuditLog`] trait.

pub mod models;
pub mod repositories;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use superres_core::durable::{AuditLog, PersistenceError};

use crate::repositories::UpscaleTaskRepo;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ---------------------------------------------------------------------------
// AuditLog adapter
// ---------------------------------------------------------------------------

/// [`AuditLog`] backed by the `upscale_tasks` table.
#[derive(Clone)]
pub struct PgAuditLog {
    pool: DbPool,
}

impl PgAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Database(e.to_string())
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record_submitted(&self, name: &str, source_url: &str) -> Result<(), PersistenceError> {
        UpscaleTaskRepo::upsert_submitted(&self.pool, name, source_url)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn mark_completed(
        &self,
        name: &str,
        source_url: &str,
        upscaled_url: &str,
    ) -> Result<(), PersistenceError> {
        UpscaleTaskRepo::mark_completed(&self.pool, name, source_url, upscaled_url)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn mark_failed(&self, name: &str, error: &str) -> Result<(), PersistenceError> {
        let updated = UpscaleTaskRepo::mark_failed(&self.pool, name, error)
            .await
            .map_err(db_err)?;
        if !updated {
            tracing::warn!(topic = %name, "No audit row to mark failed");
        }
        Ok(())
    }
}
