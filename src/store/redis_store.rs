//! Redis-backed queue store.
//!
//! Maps the `QueueStore` contract onto a Redis list: RPUSH for the tail,
//! LPOP for the head, LLEN for the length. Payloads survive service
//! restarts; ordering and single-consumer pops are Redis guarantees.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{QueueStore, StoreError};

/// Redis queue store over a multiplexed managed connection.
///
/// The connection is shared across enqueue and drain callers; pooling and
/// reconnection are the `ConnectionManager`'s concern, not this store's.
pub struct RedisQueueStore {
    connection: ConnectionManager,
}

impl RedisQueueStore {
    /// Create a store over an established managed connection.
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push_tail(&self, queue_key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.rpush(queue_key, payload).await?;
        Ok(())
    }

    async fn pop_head(&self, queue_key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.connection.clone();
        // LPOP without a count removes a single element atomically.
        let payload: Option<Vec<u8>> = conn.lpop(queue_key, None).await?;
        Ok(payload)
    }

    async fn len(&self, queue_key: &str) -> Result<usize, StoreError> {
        let mut conn = self.connection.clone();
        let count: usize = conn.llen(queue_key).await?;
        Ok(count)
    }
}
