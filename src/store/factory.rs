//! Queue store factory

use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::config::SpoolConfig;

use super::{MemoryQueueStore, QueueStore, RedisQueueStore};

/// Create a queue store based on configuration.
///
/// Returns the implementation selected by the `backend` setting:
/// - `"redis"` (default): a `RedisQueueStore` over the provided connection
/// - `"memory"`: a process-local `MemoryQueueStore`
///
/// Falls back to memory with a warning when Redis is requested without a
/// connection.
pub fn create_queue_store(
    settings: &SpoolConfig,
    connection: Option<ConnectionManager>,
) -> Arc<dyn QueueStore> {
    match settings.backend.as_str() {
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory queue store");
            Arc::new(MemoryQueueStore::new())
        }
        "redis" => {
            if let Some(connection) = connection {
                tracing::info!(
                    backend = "redis",
                    queue_key = %settings.queue_key,
                    "Creating Redis queue store"
                );
                Arc::new(RedisQueueStore::new(connection))
            } else {
                tracing::warn!(
                    "Redis backend requested but no connection provided, falling back to memory"
                );
                Arc::new(MemoryQueueStore::new())
            }
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown queue store backend, falling back to memory"
            );
            Arc::new(MemoryQueueStore::new())
        }
    }
}
