//! Queue store contract and backends.
//!
//! The spool engine talks to its backing store through the `QueueStore`
//! trait: a remote ordered list keyed by queue name, with push-to-tail,
//! pop-from-head and a length query. The store is the sole source of truth
//! for queue contents and the only synchronization point between concurrent
//! producers and drainers.

use async_trait::async_trait;

mod factory;
mod memory_store;
mod redis_store;

pub use factory::create_queue_store;
pub use memory_store::MemoryQueueStore;
pub use redis_store::RedisQueueStore;

/// Error type for store operations.
///
/// Connection-level failures are not retried here; they propagate to the
/// caller, which decides whether to retry the whole enqueue or drain call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Ordered-list store backing a spool queue.
///
/// Implementations must guarantee that `pop_head` removes at most one
/// element per call atomically, so two concurrent drains never observe the
/// same payload.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a payload to the tail of the named list.
    async fn push_tail(&self, queue_key: &str, payload: Vec<u8>) -> Result<(), StoreError>;

    /// Atomically remove and return the head element, or `None` when the
    /// list is empty or absent.
    async fn pop_head(&self, queue_key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Current element count for the named list.
    async fn len(&self, queue_key: &str) -> Result<usize, StoreError>;
}
