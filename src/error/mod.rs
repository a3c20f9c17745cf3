use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;

/// Top-level error for spool operations.
///
/// A propagated error means the whole enqueue or drain call aborted; partial
/// drain progress is reported only through the successful return path.
#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid connection string: {0}")]
    InvalidDsn(String),
}

pub type Result<T> = std::result::Result<T, SpoolError>;
