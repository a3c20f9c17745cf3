//! Redis-backed session storage.
//!
//! A thin get/set/delete-with-expiry wrapper over the shared Redis
//! connection, for HTTP session handlers that outsource persistence.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;

use crate::store::StoreError;

/// Configuration for the session store
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session TTL in seconds; 0 stores sessions without expiry
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    /// Optional key prefix applied to every session ID
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_session_ttl() -> u64 {
    3600 // 1 hour
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            prefix: None,
        }
    }
}

/// Session store over a shared Redis connection.
pub struct SessionStore {
    connection: ConnectionManager,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(connection: ConnectionManager, config: SessionConfig) -> Self {
        Self { connection, config }
    }

    /// Read session data; absent sessions read as an empty string.
    pub async fn read(&self, session_id: &str) -> Result<String, StoreError> {
        let mut conn = self.connection.clone();
        let data: Option<String> = conn.get(self.key(session_id)).await?;
        Ok(data.unwrap_or_default())
    }

    /// Write session data, with expiry when a TTL is configured.
    pub async fn write(&self, session_id: &str, data: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let key = self.key(session_id);

        if self.config.ttl_seconds > 0 {
            let _: () = conn.set_ex(key, data, self.config.ttl_seconds).await?;
        } else {
            let _: () = conn.set(key, data).await?;
        }

        Ok(())
    }

    /// Delete a session.
    pub async fn destroy(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.key(session_id)).await?;
        Ok(())
    }

    fn key(&self, session_id: &str) -> String {
        session_key(self.config.prefix.as_deref(), session_id)
    }
}

/// Apply the configured prefix to a session ID.
fn session_key(prefix: Option<&str>, session_id: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}{session_id}"),
        _ => session_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl_seconds, 3600);
        assert!(config.prefix.is_none());
    }

    #[test]
    fn test_key_prefixing() {
        assert_eq!(
            session_key(Some("app:sessions:"), "abc"),
            "app:sessions:abc"
        );
        assert_eq!(session_key(None, "abc"), "abc");
        assert_eq!(session_key(Some(""), "abc"), "abc");
    }
}
