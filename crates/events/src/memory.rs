//! In-process [`DurableStore`].
//!
//! Keeps hashes, values and lists in memory and records every published
//! message. Used by tests and for local runs without Redis. Writes can be
//! switched off with [`MemoryStore::set_unavailable`] to exercise the
//! non-fatal persistence paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use superres_core::durable::{DurableStore, PersistenceError};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    values: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    published: Vec<(String, String)>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While `true`, every operation fails with [`PersistenceError::Store`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Payloads published on `channel`, in publish order.
    pub async fn published(&self, channel: &str) -> Vec<String> {
        self.inner
            .lock()
            .await
            .published
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Store("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner
            .lock()
            .await
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, PersistenceError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), PersistenceError> {
        self.check()?;
        if let Some(hash) = self.inner.lock().await.hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner
            .lock()
            .await
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.check()?;
        Ok(self.inner.lock().await.values.get(key).cloned())
    }

    async fn append(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner
            .lock()
            .await
            .lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .lists
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner
            .lock()
            .await
            .published
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites() {
        let store = MemoryStore::new();
        store.put("k", "a").await.unwrap();
        store.put("k", "b").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn hash_fields_are_independent() {
        let store = MemoryStore::new();
        store.hash_set("h", "cat", "5").await.unwrap();
        store.hash_set("h", "dog", "11").await.unwrap();
        assert_eq!(store.hash_get("h", "cat").await.unwrap().as_deref(), Some("5"));
        assert_eq!(store.hash_get("h", "dog").await.unwrap().as_deref(), Some("11"));
        assert_eq!(store.hash_get("h", "eel").await.unwrap(), None);
    }

    #[tokio::test]
    async fn hash_delete_removes_only_that_field() {
        let store = MemoryStore::new();
        store.hash_set("h", "cat", "100").await.unwrap();
        store.hash_set("h", "dog", "40").await.unwrap();
        store.hash_delete("h", "cat").await.unwrap();
        store.hash_delete("h", "cat").await.unwrap();
        store.hash_delete("missing", "cat").await.unwrap();
        assert_eq!(store.hash_get("h", "cat").await.unwrap(), None);
        assert_eq!(store.hash_get("h", "dog").await.unwrap().as_deref(), Some("40"));
    }

    #[tokio::test]
    async fn list_preserves_append_order() {
        let store = MemoryStore::new();
        store.append("l", "1").await.unwrap();
        store.append("l", "2").await.unwrap();
        assert_eq!(store.list("l").await.unwrap(), vec!["1", "2"]);
        assert!(store.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_is_recorded_per_channel() {
        let store = MemoryStore::new();
        store.publish("ch", "hello").await.unwrap();
        assert_eq!(store.published("ch").await, vec!["hello"]);
        assert!(store.published("other").await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.put("k", "v").await.is_err());
        assert!(store.publish("c", "p").await.is_err());
        store.set_unavailable(false);
        assert!(store.put("k", "v").await.is_ok());
    }
}
