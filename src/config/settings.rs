use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::session::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub spool: SpoolConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub drain: DrainTaskConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    /// Queue store backend: "redis" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Redis key holding the spool list
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// Max messages delivered per drain pass; 0 = unlimited
    #[serde(default)]
    pub max_messages_per_drain: u64,
    /// Max wall-clock seconds per drain pass; 0 = unlimited
    #[serde(default)]
    pub max_seconds_per_drain: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrainTaskConfig {
    /// Seconds between drain passes
    #[serde(default = "default_drain_interval")]
    pub interval_seconds: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_backend() -> String {
    "redis".to_string()
}

fn default_queue_key() -> String {
    "spool:mail".to_string()
}

fn default_drain_interval() -> u64 {
    30 // 30 seconds
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("redis.url", "redis://localhost:6379")?
            .set_default("spool.backend", "redis")?
            .set_default("spool.queue_key", "spool:mail")?
            .set_default("spool.max_messages_per_drain", 0)?
            .set_default("spool.max_seconds_per_drain", 0)?
            .set_default("drain.interval_seconds", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables. A double underscore separates
            // nesting levels so keys with underscores stay addressable:
            // REDIS__URL, SPOOL__QUEUE_KEY, SPOOL__MAX_MESSAGES_PER_DRAIN, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            queue_key: default_queue_key(),
            max_messages_per_drain: 0,
            max_seconds_per_drain: 0,
        }
    }
}

impl Default for DrainTaskConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_drain_interval(),
        }
    }
}
