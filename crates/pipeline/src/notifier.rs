//! Result persistence and completion fan-out.
//!
//! Completion is split in two so the job manager can mark the job
//! `Completed` between them:
//!
//! 1. [`CompletionNotifier::persist_result`] writes the canvas to the
//!    result sink and derives its public URL. Failing here fails the job.
//! 2. [`CompletionNotifier::announce`] writes the completion record to the
//!    metadata projection, publishes it, appends it to the processed list
//!    and updates the relational audit row. Each of these is an isolated
//!    failure domain: errors are logged and nothing is rolled back.

use std::path::PathBuf;
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use superres_core::durable::{AuditLog, DurableStore};
use superres_core::error::JobError;
use superres_core::job::Job;
use superres_core::keys::KeySchema;
use superres_core::types::JobId;
use superres_events::messages::CompletionRecord;

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

/// Where a finished canvas ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub path: PathBuf,
    pub url: String,
}

/// Writes result images as PNG files under one directory.
#[derive(Debug, Clone)]
pub struct LocalResultSink {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalResultSink {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn file_name(id: JobId) -> String {
        format!("{id}_upscaled.png")
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!(
            "{}/results/{file_name}",
            self.public_base_url.trim_end_matches('/')
        )
    }

    /// Blocking write of `canvas` for job `id`.
    pub fn save(&self, id: JobId, canvas: &RgbImage) -> Result<StoredResult, JobError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| JobError::ResultSink(format!("{}: {e}", self.dir.display())))?;

        let file_name = Self::file_name(id);
        let path = self.dir.join(&file_name);
        canvas
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| JobError::ResultSink(format!("{}: {e}", path.display())))?;

        Ok(StoredResult {
            url: self.url_for(&file_name),
            path,
        })
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CompletionNotifier {
    sink: LocalResultSink,
    store: Arc<dyn DurableStore>,
    audit: Arc<dyn AuditLog>,
    schema: KeySchema,
}

impl CompletionNotifier {
    pub fn new(
        sink: LocalResultSink,
        store: Arc<dyn DurableStore>,
        audit: Arc<dyn AuditLog>,
        schema: KeySchema,
    ) -> Self {
        Self {
            sink,
            store,
            audit,
            schema,
        }
    }

    /// Write the canvas off the async runtime and return its location.
    pub async fn persist_result(
        &self,
        id: JobId,
        canvas: RgbImage,
    ) -> Result<StoredResult, JobError> {
        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.save(id, &canvas))
            .await
            .map_err(|e| JobError::ResultSink(format!("result writer stopped: {e}")))?
    }

    /// Fan the completion of `job` out to every durable path.
    pub async fn announce(&self, job: &Job, result: &StoredResult) -> CompletionRecord {
        let record = CompletionRecord::new(&job.name, &job.source_url, &result.url);
        let topic = job.name.as_str();

        match serde_json::to_string(&record) {
            Ok(payload) => {
                if let Err(e) = self
                    .store
                    .put(&self.schema.metadata_key(topic), &payload)
                    .await
                {
                    tracing::error!(topic, error = %e, "Failed to write completion metadata");
                }
                if let Err(e) = self
                    .store
                    .publish(self.schema.completion_channel(), &payload)
                    .await
                {
                    tracing::error!(topic, error = %e, "Failed to publish completion");
                }
                if let Err(e) = self
                    .store
                    .append(self.schema.processed_list(), &payload)
                    .await
                {
                    tracing::error!(topic, error = %e, "Failed to append to processed list");
                }
            }
            Err(e) => tracing::error!(topic, error = %e, "Failed to encode completion record"),
        }

        if let Err(e) = self
            .audit
            .mark_completed(topic, &job.source_url, &result.url)
            .await
        {
            tracing::error!(topic, error = %e, "Failed to update audit record");
        }

        tracing::info!(job_id = %job.id, topic, upscaled_url = %result.url, "Completion announced");
        record
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn url_joins_base_without_double_slash() {
        let sink = LocalResultSink::new("/tmp", "http://host:7001/");
        assert_eq!(
            sink.url_for("3_upscaled.png"),
            "http://host:7001/results/3_upscaled.png"
        );
    }

    #[test]
    fn save_writes_png_named_after_job() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalResultSink::new(dir.path().join("out"), "http://h");
        let stored = sink.save(JobId::new(5), &RgbImage::new(8, 4)).unwrap();

        assert_eq!(stored.path, dir.path().join("out").join("5_upscaled.png"));
        assert_eq!(stored.url, "http://h/results/5_upscaled.png");
        let reread = image::open(&stored.path).unwrap();
        assert_eq!((reread.width(), reread.height()), (8, 4));
    }

    #[test]
    fn unwritable_directory_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let sink = LocalResultSink::new(blocker.join("nested"), "http://h");
        assert_matches!(
            sink.save(JobId::new(1), &RgbImage::new(1, 1)),
            Err(JobError::ResultSink(_))
        );
    }
}
