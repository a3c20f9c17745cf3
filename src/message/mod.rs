//! Outbound message model.
//!
//! A spooled message is one unit of outbound work: an email with its
//! recipients, captured at enqueue time and reconstructed at drain time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An outbound email awaiting delivery.
///
/// The message carries no delivery state; its only identity on the wire is
/// its position in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Recipient addresses
    pub recipients: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Create a new message with a fresh ID and timestamp.
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipients,
            subject: subject.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Number of recipients on this message.
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }
}
