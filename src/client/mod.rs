//! Redis client provisioning.
//!
//! Builds a managed connection from a connection string and fixes the wire
//! codec for that connection. The codec choice is connection-wide: every
//! message spooled through the resulting client uses it.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::Client;

use crate::codec::{JsonCodec, MessageCodec};
use crate::error::{Result, SpoolError};

/// Options for building a spool client.
#[derive(Default)]
pub struct ConnectOptions {
    /// Wire codec override; defaults to JSON when unset.
    pub codec: Option<Arc<dyn MessageCodec>>,
}

/// An established store connection paired with its wire codec.
#[derive(Clone)]
pub struct SpoolClient {
    pub connection: ConnectionManager,
    pub codec: Arc<dyn MessageCodec>,
}

/// Connect to Redis from a DSN and select the wire codec.
///
/// The DSN is validated before any network activity; a malformed one is a
/// configuration error, not a connectivity failure.
pub async fn connect(dsn: &str, options: ConnectOptions) -> Result<SpoolClient> {
    let client =
        Client::open(dsn).map_err(|e| SpoolError::InvalidDsn(format!("{dsn}: {e}")))?;

    let connection = client.get_connection_manager().await?;

    let codec = options
        .codec
        .unwrap_or_else(|| Arc::new(JsonCodec) as Arc<dyn MessageCodec>);

    tracing::info!(codec = codec.name(), "Redis spool client connected");

    Ok(SpoolClient { connection, codec })
}
