//! Redis-backed durable store.
//!
//! Keys and channels are chosen by the caller through
//! [`KeySchema`](superres_core::keys::KeySchema); this adapter only maps
//! the [`DurableStore`] operations onto Redis commands. Stored values are
//! read as raw bytes and decoded as UTF-8 here, so every caller sees text;
//! a value that is not valid UTF-8 is logged and treated as absent.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use superres_core::durable::{DurableStore, PersistenceError};

/// Shared Redis connection, cheap to clone into every job task.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Open a managed connection and verify it with `PING`.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection_manager().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client, conn })
    }

    /// Subscribe to `channel`, yielding each message payload as text.
    ///
    /// Uses a dedicated connection; the stream ends when that connection
    /// drops.
    pub async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<BoxStream<'static, String>, redis::RedisError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        tracing::warn!(
                            channel = %msg.get_channel_name(),
                            error = %e,
                            "Dropping non-text pub/sub payload"
                        );
                        None
                    }
                }
            })
            .boxed();
        Ok(stream)
    }
}

fn store_err(e: redis::RedisError) -> PersistenceError {
    PersistenceError::Store(e.to_string())
}

/// Decode a stored value as UTF-8 text.
fn decode(key: &str, raw: Option<Vec<u8>>) -> Option<String> {
    let bytes = raw?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(key, error = %e, "Stored value is not UTF-8, treating as absent");
            None
        }
    }
}

#[async_trait]
impl DurableStore for RedisStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(store_err)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, PersistenceError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.hget(key, field).await.map_err(store_err)?;
        Ok(decode(key, raw))
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(key, field).await.map_err(store_err)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(store_err)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await.map_err(store_err)?;
        Ok(decode(key, raw))
    }

    async fn append(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, value).await.map_err(store_err)
    }

    async fn list(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        let mut conn = self.conn.clone();
        let raw: Vec<Vec<u8>> = conn.lrange(key, 0, -1).await.map_err(store_err)?;
        Ok(raw
            .into_iter()
            .filter_map(|item| decode(key, Some(item)))
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .map_err(store_err)
    }
}
