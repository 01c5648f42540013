//! Messages, event bus and durable store adapters.
//!
//! - [`messages`] — wire shapes published to and read from the shared store.
//! - [`EventBus`] — in-process publish/subscribe hub for [`JobEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`RedisStore`] — [`DurableStore`](superres_core::durable::DurableStore)
//!   on Redis hashes, strings, lists and pub/sub.
//! - [`MemoryStore`] — the same contract held in process memory.

pub mod bus;
pub mod memory;
pub mod messages;
pub mod redis_store;

pub use bus::{EventBus, JobEvent};
pub use memory::MemoryStore;
pub use messages::{CompletionRecord, ProgressMessage, SubmitRequest, TopicMetadata};
pub use redis_store::RedisStore;
