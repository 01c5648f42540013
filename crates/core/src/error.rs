use crate::job::JobStatus;

/// Errors returned by the job lifecycle surface (`submit`, `get`, `close`).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate name: an active job already owns '{0}'")]
    DuplicateName(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Pipeline saturated: {limit} jobs already admitted")]
    Saturated { limit: usize },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Job-local failures. Any of these terminates the owning job in
/// [`JobStatus::Failed`] and never affects other jobs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Source image not found: {0}")]
    ImageNotFound(String),

    #[error("Unable to decode source image: {0}")]
    Decode(String),

    #[error("Upscaling failed on tile ({row}, {col}): {message}")]
    Inference {
        row: u32,
        col: u32,
        message: String,
    },

    #[error("Unable to store result image: {0}")]
    ResultSink(String),

    #[error("Processing aborted: {0}")]
    Aborted(String),
}
