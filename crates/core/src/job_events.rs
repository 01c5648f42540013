//! Message type tags carried in the `type` field of published records.

/// Per-tile progress update on the progress channel.
pub const MSG_TYPE_PROGRESS: &str = "progress";

/// Completion record on the completion channel and in the metadata projection.
pub const MSG_TYPE_COMPLETE: &str = "complete";
