//! Mirrors tile progress into the durable store.
//!
//! For each finished tile the percentage is written to the progress map
//! (field = job name) and a [`ProgressMessage`] is published on the
//! progress channel. The field is removed again once the job ends. Store
//! failures are logged and never reach the job.

use std::sync::Arc;

use superres_core::durable::DurableStore;
use superres_core::keys::KeySchema;
use superres_core::progress::percent;
use superres_events::messages::ProgressMessage;

#[derive(Clone)]
pub struct ProgressPublisher {
    store: Arc<dyn DurableStore>,
    schema: KeySchema,
}

impl ProgressPublisher {
    pub fn new(store: Arc<dyn DurableStore>, schema: KeySchema) -> Self {
        Self { store, schema }
    }

    /// Report `tiles_done` of `tiles_total` for `topic`. Returns the percent.
    ///
    /// Must be called once per tile, in tile order, after the tile has been
    /// written to the canvas; the published sequence is then non-decreasing
    /// and reaches 100 only on the last tile.
    pub async fn report(&self, topic: &str, tiles_done: usize, tiles_total: usize) -> u8 {
        let pct = percent(tiles_done, tiles_total);
        tracing::debug!(topic, tiles_done, tiles_total, percent = pct, "Tile progress");

        self.write(topic, pct).await;

        match serde_json::to_string(&ProgressMessage::new(topic, pct)) {
            Ok(payload) => {
                if let Err(e) = self
                    .store
                    .publish(self.schema.progress_channel(), &payload)
                    .await
                {
                    tracing::error!(topic, error = %e, "Failed to publish progress");
                }
            }
            Err(e) => tracing::error!(topic, error = %e, "Failed to encode progress message"),
        }

        pct
    }

    /// Seed the progress map with 0 for a newly submitted job.
    pub async fn reset(&self, topic: &str) {
        self.write(topic, 0).await;
    }

    /// Remove `topic` from the progress map once its job is terminal.
    pub async fn clear(&self, topic: &str) {
        if let Err(e) = self
            .store
            .hash_delete(self.schema.progress_map(), topic)
            .await
        {
            tracing::error!(topic, error = %e, "Failed to clear progress map entry");
        }
    }

    async fn write(&self, topic: &str, pct: u8) {
        if let Err(e) = self
            .store
            .hash_set(self.schema.progress_map(), topic, &pct.to_string())
            .await
        {
            tracing::error!(topic, error = %e, "Failed to write progress map");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
