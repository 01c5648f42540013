//! Repository for the `upscale_tasks` audit table.
//!
//! Status literals come from [`JobStatus::name`]; the table only ever
//! holds `processing`, `completed` or `failed`.

use sqlx::PgPool;
use superres_core::job::JobStatus;

use crate::models::upscale_task::UpscaleTask;

/// Column list for `upscale_tasks` queries.
const COLUMNS: &str = "\
    id, topic_name, image_url, upscaled_url, status, error_message, \
    created_at, completed_at";

/// Maximum page size for completed-task listing.
const MAX_LIMIT: i64 = 100;

/// Provides audit operations keyed by job name.
pub struct UpscaleTaskRepo;

impl UpscaleTaskRepo {
    /// Insert the row for a freshly submitted job.
    ///
    /// A name that was used before is reset to `processing` with its
    /// previous result and error cleared.
    pub async fn upsert_submitted(
        pool: &PgPool,
        topic_name: &str,
        image_url: &str,
    ) -> Result<UpscaleTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO upscale_tasks (topic_name, image_url, status) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (topic_name) DO UPDATE \
             SET image_url = EXCLUDED.image_url, status = EXCLUDED.status, \
                 upscaled_url = NULL, error_message = NULL, \
                 created_at = NOW(), completed_at = NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UpscaleTask>(&query)
            .bind(topic_name)
            .bind(image_url)
            .bind(JobStatus::Processing.name())
            .fetch_one(pool)
            .await
    }

    /// Mark a job completed with its public result URL.
    ///
    /// Creates the row when the submission insert never landed.
    pub async fn mark_completed(
        pool: &PgPool,
        topic_name: &str,
        image_url: &str,
        upscaled_url: &str,
    ) -> Result<UpscaleTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO upscale_tasks (topic_name, image_url, upscaled_url, status, completed_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (topic_name) DO UPDATE \
             SET upscaled_url = EXCLUDED.upscaled_url, status = EXCLUDED.status, \
                 error_message = NULL, completed_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UpscaleTask>(&query)
            .bind(topic_name)
            .bind(image_url)
            .bind(upscaled_url)
            .bind(JobStatus::Completed.name())
            .fetch_one(pool)
            .await
    }

    /// Mark a job failed. Returns `false` when no row exists for the name.
    pub async fn mark_failed(
        pool: &PgPool,
        topic_name: &str,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE upscale_tasks \
             SET status = $2, error_message = $3, completed_at = NOW() \
             WHERE topic_name = $1",
        )
        .bind(topic_name)
        .bind(JobStatus::Failed.name())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_name(
        pool: &PgPool,
        topic_name: &str,
    ) -> Result<Option<UpscaleTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM upscale_tasks WHERE topic_name = $1");
        sqlx::query_as::<_, UpscaleTask>(&query)
            .bind(topic_name)
            .fetch_optional(pool)
            .await
    }

    /// Most recently completed tasks, newest first. `limit` is capped at 100.
    pub async fn list_completed(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<UpscaleTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM upscale_tasks \
             WHERE status = $1 \
             ORDER BY completed_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, UpscaleTask>(&query)
            .bind(JobStatus::Completed.name())
            .bind(limit.clamp(1, MAX_LIMIT))
            .fetch_all(pool)
            .await
    }
}
