//! Domain core for the tiled super-resolution pipeline.
//!
//! Pure types and functions shared by every other crate: the job model
//! and its state machine, the tile grid partition, progress arithmetic,
//! the durable key schema, and the traits behind which the external
//! collaborators (upscaling capability, durable store, audit log) live.

pub mod durable;
pub mod error;
pub mod job;
pub mod job_events;
pub mod keys;
pub mod progress;
pub mod tiling;
pub mod types;
pub mod upscaler;
pub mod validation;
