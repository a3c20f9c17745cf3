//! In-memory queue store using DashMap.
//!
//! Backs the spool with process-local lists. Contents are lost on restart;
//! intended for tests and local runs without a Redis instance.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{QueueStore, StoreError};

/// In-memory queue store.
///
/// Each queue key maps to a `VecDeque`. A pop takes the shard lock for the
/// entry, so concurrent drains split a queue without seeing the same
/// payload twice, matching the Redis backend's single-pop atomicity.
#[derive(Default)]
pub struct MemoryQueueStore {
    queues: DashMap<String, VecDeque<Vec<u8>>>,
}

impl MemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn push_tail(&self, queue_key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        self.queues
            .entry(queue_key.to_string())
            .or_default()
            .push_back(payload);
        Ok(())
    }

    async fn pop_head(&self, queue_key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .queues
            .get_mut(queue_key)
            .and_then(|mut queue| queue.pop_front()))
    }

    async fn len(&self, queue_key: &str) -> Result<usize, StoreError> {
        Ok(self.queues.get(queue_key).map(|q| q.len()).unwrap_or(0))
    }
}
