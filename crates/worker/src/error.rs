/// Fatal startup failures. The process exits before accepting any job.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unable to reach the durable store: {0}")]
    StoreConnect(String),

    #[error("Database unavailable: {0}")]
    Database(String),

    #[error("Unable to load the upscaling model: {0}")]
    ModelLoad(String),
}
