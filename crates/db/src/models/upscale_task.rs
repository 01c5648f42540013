//! Row model for the `upscale_tasks` audit table.

use serde::Serialize;
use sqlx::FromRow;
use superres_core::types::Timestamp;

/// A row from the `upscale_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UpscaleTask {
    pub id: i64,
    pub topic_name: String,
    pub image_url: String,
    pub upscaled_url: Option<String>,
    /// One of `processing`, `completed`, `failed`.
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
