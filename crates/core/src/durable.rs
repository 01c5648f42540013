//! Durable collaborators: the shared key-value/pub-sub store and the
//! relational audit log.
//!
//! Both hold weaker-consistency projections of job state. Writes are
//! fire-and-forget from a job's point of view: callers log a
//! [`PersistenceError`] and carry on, never reverting a decided status.
//! Values cross this boundary as UTF-8 text.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

/// Keyed storage plus publish/subscribe messaging.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Set `field` of the hash at `key`.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), PersistenceError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, PersistenceError>;

    /// Remove `field` from the hash at `key`. Missing fields are not an error.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), PersistenceError>;

    /// Overwrite the value at `key` (last write wins).
    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Append to the list at `key`.
    async fn append(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Every element of the list at `key`, oldest first.
    async fn list(&self, key: &str) -> Result<Vec<String>, PersistenceError>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PersistenceError>;
}

/// Relational audit trail, one row per job name.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Insert (or reset) the row for `name` in the processing state.
    async fn record_submitted(&self, name: &str, source_url: &str) -> Result<(), PersistenceError>;

    /// Record completion, creating the row if the submission insert was lost.
    async fn mark_completed(
        &self,
        name: &str,
        source_url: &str,
        upscaled_url: &str,
    ) -> Result<(), PersistenceError>;

    async fn mark_failed(&self, name: &str, error: &str) -> Result<(), PersistenceError>;
}
