//! Asynchronous tiled super-resolution pipeline.
//!
//! - [`TileEngine`] — partition, per-tile upscale and stitch.
//! - [`ProgressPublisher`] — tile counts to percent, mirrored to the store.
//! - [`CompletionNotifier`] — result persistence and the completion record.
//! - [`JobManager`] — job registry, lifecycle and the bounded worker pool.
//! - [`retention`] — background sweep of expired terminal jobs.

pub mod config;
pub mod manager;
pub mod notifier;
pub mod progress;
pub mod retention;
pub mod tile_engine;

pub use config::PipelineConfig;
pub use manager::JobManager;
pub use notifier::{CompletionNotifier, LocalResultSink, StoredResult};
pub use progress::ProgressPublisher;
pub use tile_engine::{decode_source, TileEngine};
