//! Delivery transport contract.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::SpoolError;
use crate::message::OutboundMessage;

/// The external collaborator that actually sends a message.
///
/// The spool consumes a transport only through this capability set. A drain
/// starts the transport lazily, after confirming the queue is non-empty, so
/// an idle spool never holds an open delivery connection.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Whether the transport is ready to send.
    fn is_started(&self) -> bool;

    /// Bring the transport up. A failure here aborts the whole drain.
    async fn start(&self) -> Result<(), SpoolError>;

    /// Deliver one message.
    ///
    /// Returns the number of recipients delivered to and appends the
    /// identifiers of any failed recipients to `failed_recipients`. A
    /// per-recipient failure is not an error; an `Err` means the transport
    /// itself broke and the drain aborts.
    async fn send(
        &self,
        message: &OutboundMessage,
        failed_recipients: &mut Vec<String>,
    ) -> Result<usize, SpoolError>;
}

/// Transport that logs deliveries instead of performing them.
///
/// Used by the drain driver in deployments that wire the real mailer
/// elsewhere, and handy for smoke-testing a spool end to end.
#[derive(Default)]
pub struct TracingTransport {
    started: AtomicBool,
}

impl TracingTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryTransport for TracingTransport {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    async fn start(&self) -> Result<(), SpoolError> {
        self.started.store(true, Ordering::Release);
        tracing::info!("Tracing transport started");
        Ok(())
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        _failed_recipients: &mut Vec<String>,
    ) -> Result<usize, SpoolError> {
        tracing::info!(
            message_id = %message.id,
            recipients = message.recipient_count(),
            subject = %message.subject,
            "Message delivered"
        );
        Ok(message.recipient_count())
    }
}
