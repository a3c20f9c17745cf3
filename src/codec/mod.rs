//! Wire codec for spooled messages.
//!
//! The codec is chosen once per store connection, not per message. JSON is
//! the default; a deployment that wants a more compact representation plugs
//! in its own `MessageCodec` implementation when building the client.

use crate::message::OutboundMessage;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Message could not be serialized for the store
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// A popped payload could not be reconstructed into a message
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serializes messages to and from their store representation.
pub trait MessageCodec: Send + Sync {
    /// Codec name, used in logs and configuration matching.
    fn name(&self) -> &'static str;

    /// Serialize a message to its wire form.
    fn encode(&self, message: &OutboundMessage) -> Result<Vec<u8>, CodecError>;

    /// Reconstruct a message from its wire form.
    fn decode(&self, payload: &[u8]) -> Result<OutboundMessage, CodecError>;
}

/// JSON codec, the default wire format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, message: &OutboundMessage) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(message).map_err(CodecError::Encode)
    }

    fn decode(&self, payload: &[u8]) -> Result<OutboundMessage, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::Decode)
    }
}
