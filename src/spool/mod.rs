//! Spool engine: durable, at-least-once outbound message queue.
//!
//! Producers enqueue serialized messages into a store-backed list; a
//! periodic driver drains them in FIFO order through a delivery transport,
//! bounded by an optional per-drain message count and wall-clock duration.
//!
//! # Design
//!
//! - The store is the sole source of truth: no in-process copy of queue
//!   contents, no engine-level locking. Concurrent drains split the queue
//!   between them because the store pops one head element atomically.
//! - A popped message is removed before delivery is attempted; there is no
//!   re-queue on failure. Per-recipient failures accumulate in the caller's
//!   list while the drain continues.
//! - Store connectivity failures are not retried here; they abort the call
//!   and leave retry policy to the driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::codec::MessageCodec;
use crate::error::Result;
use crate::message::OutboundMessage;
use crate::store::QueueStore;

mod transport;

pub use transport::{DeliveryTransport, TracingTransport};

/// Per-drain stopping thresholds, fixed at construction.
///
/// A threshold of zero in configuration means unlimited and is normalized
/// to `None` here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryLimits {
    /// Stop after this many delivered messages
    max_messages: Option<usize>,
    /// Stop once this much wall-clock time has elapsed
    max_seconds: Option<u64>,
}

impl DeliveryLimits {
    /// Build limits from raw configuration values; 0 = unlimited.
    pub fn new(max_messages: u64, max_seconds: u64) -> Self {
        Self {
            max_messages: (max_messages > 0).then_some(max_messages as usize),
            max_seconds: (max_seconds > 0).then_some(max_seconds),
        }
    }

    /// No thresholds; a drain runs until the queue is empty.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }

    pub fn max_seconds(&self) -> Option<u64> {
        self.max_seconds
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages handed to the transport and counted as delivered
    pub delivered: usize,
    /// Popped payloads that could not be decoded and were skipped
    pub skipped: usize,
}

/// Store-backed outbound message spool.
///
/// Enqueue and drain are independent operations against the same queue key;
/// the engine may be shared across tasks behind an `Arc`.
pub struct SpoolEngine {
    store: Arc<dyn QueueStore>,
    codec: Arc<dyn MessageCodec>,
    queue_key: String,
    limits: DeliveryLimits,
    /// Lifecycle flag for the external start/stop contract. Queryable only;
    /// drain consults transport state, never this flag.
    started: AtomicBool,
}

impl SpoolEngine {
    /// Create an engine over a store, wire codec, queue key and limits.
    pub fn new(
        store: Arc<dyn QueueStore>,
        codec: Arc<dyn MessageCodec>,
        queue_key: impl Into<String>,
        limits: DeliveryLimits,
    ) -> Self {
        Self {
            store,
            codec,
            queue_key: queue_key.into(),
            limits,
            started: AtomicBool::new(false),
        }
    }

    /// Mark the spool started. No-op on the underlying connection.
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Mark the spool stopped. No-op on the underlying connection.
    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Queue key this engine operates on.
    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    /// Number of messages currently spooled.
    pub async fn queue_len(&self) -> Result<usize> {
        Ok(self.store.len(&self.queue_key).await?)
    }

    /// Serialize a message and append it to the spool.
    ///
    /// Fire-and-forget: success means the store accepted the payload, not
    /// that delivery will ever be attempted or acknowledged.
    pub async fn enqueue(&self, message: &OutboundMessage) -> Result<()> {
        let payload = self.codec.encode(message)?;
        self.store.push_tail(&self.queue_key, payload).await?;

        tracing::debug!(
            message_id = %message.id,
            queue_key = %self.queue_key,
            "Message spooled"
        );

        Ok(())
    }

    /// Pop and deliver spooled messages until a stopping condition fires or
    /// the queue is empty.
    ///
    /// Returns the drain report; failed recipient identifiers reported by
    /// the transport accumulate in `failed_recipients` in the order
    /// encountered. An `Err` means the whole pass aborted; messages already
    /// handed to the transport stay delivered and messages still queued stay
    /// queued.
    pub async fn drain(
        &self,
        transport: &dyn DeliveryTransport,
        failed_recipients: &mut Vec<String>,
    ) -> Result<DrainReport> {
        // Fast path: do not touch the transport for an empty queue.
        if self.store.len(&self.queue_key).await? == 0 {
            return Ok(DrainReport::default());
        }

        if !transport.is_started() {
            transport.start().await?;
        }

        let started_at = Instant::now();
        let mut report = DrainReport::default();

        loop {
            let Some(payload) = self.store.pop_head(&self.queue_key).await? else {
                // Fully drained, possibly by a concurrent consumer.
                break;
            };

            let message = match self.codec.decode(&payload) {
                Ok(message) => message,
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(
                        error = %e,
                        queue_key = %self.queue_key,
                        "Skipping spooled payload that failed to decode"
                    );
                    continue;
                }
            };

            report.delivered += transport.send(&message, failed_recipients).await?;

            // Items before time: an items-exhausted pass never reads the clock.
            if let Some(max) = self.limits.max_messages {
                if report.delivered >= max {
                    break;
                }
            }
            if let Some(max) = self.limits.max_seconds {
                if started_at.elapsed() >= Duration::from_secs(max) {
                    break;
                }
            }
        }

        tracing::info!(
            queue_key = %self.queue_key,
            delivered = report.delivered,
            skipped = report.skipped,
            failed_recipients = failed_recipients.len(),
            "Drain pass completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::codec::JsonCodec;
    use crate::error::SpoolError;
    use crate::store::MemoryQueueStore;

    /// Transport double that records sends and can fail configured
    /// recipients per subject.
    #[derive(Default)]
    struct RecordingTransport {
        started: AtomicBool,
        start_calls: AtomicUsize,
        sent: Mutex<Vec<OutboundMessage>>,
        failures_by_subject: Mutex<HashMap<String, Vec<String>>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self::default()
        }

        fn fail_recipients(&self, subject: &str, recipients: &[&str]) {
            self.failures_by_subject.lock().unwrap().insert(
                subject.to_string(),
                recipients.iter().map(|r| r.to_string()).collect(),
            );
        }

        fn sent_subjects(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.subject.clone())
                .collect()
        }

        fn start_calls(&self) -> usize {
            self.start_calls.load(Ordering::Acquire)
        }
    }

    #[async_trait::async_trait]
    impl DeliveryTransport for RecordingTransport {
        fn is_started(&self) -> bool {
            self.started.load(Ordering::Acquire)
        }

        async fn start(&self) -> Result<()> {
            self.start_calls.fetch_add(1, Ordering::AcqRel);
            self.started.store(true, Ordering::Release);
            Ok(())
        }

        async fn send(
            &self,
            message: &OutboundMessage,
            failed_recipients: &mut Vec<String>,
        ) -> Result<usize> {
            let failed = self
                .failures_by_subject
                .lock()
                .unwrap()
                .get(&message.subject)
                .cloned()
                .unwrap_or_default();

            let delivered = message.recipient_count() - failed.len();
            failed_recipients.extend(failed);
            self.sent.lock().unwrap().push(message.clone());
            Ok(delivered)
        }
    }

    /// Transport whose sends take a fixed amount of (tokio) time.
    struct SlowTransport {
        delay: Duration,
        sent: AtomicUsize,
    }

    impl SlowTransport {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                sent: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl DeliveryTransport for SlowTransport {
        fn is_started(&self) -> bool {
            true
        }

        async fn start(&self) -> Result<()> {
            Ok(())
        }

        async fn send(
            &self,
            message: &OutboundMessage,
            _failed_recipients: &mut Vec<String>,
        ) -> Result<usize> {
            tokio::time::sleep(self.delay).await;
            self.sent.fetch_add(1, Ordering::AcqRel);
            Ok(message.recipient_count())
        }
    }

    /// Transport that cannot be started.
    struct BrokenTransport;

    #[async_trait::async_trait]
    impl DeliveryTransport for BrokenTransport {
        fn is_started(&self) -> bool {
            false
        }

        async fn start(&self) -> Result<()> {
            Err(SpoolError::Transport("connection refused".to_string()))
        }

        async fn send(
            &self,
            _message: &OutboundMessage,
            _failed_recipients: &mut Vec<String>,
        ) -> Result<usize> {
            unreachable!("send must not be called on a transport that failed to start")
        }
    }

    fn engine_with_limits(limits: DeliveryLimits) -> SpoolEngine {
        SpoolEngine::new(
            Arc::new(MemoryQueueStore::new()),
            Arc::new(JsonCodec),
            "spool:test",
            limits,
        )
    }

    fn message(subject: &str) -> OutboundMessage {
        OutboundMessage::new(vec![format!("{subject}@example.com")], subject, "body")
    }

    #[tokio::test]
    async fn test_unbounded_drain_delivers_everything() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());
        for i in 0..10 {
            engine.enqueue(&message(&format!("m{i}"))).await.unwrap();
        }

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(report.delivered, 10);
        assert_eq!(report.skipped, 0);
        assert!(failed.is_empty());
        assert_eq!(engine.queue_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_preserves_fifo_order() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());
        for subject in ["first", "second", "third"] {
            engine.enqueue(&message(subject)).await.unwrap();
        }

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(transport.sent_subjects(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_max_messages_limit_stops_drain() {
        let engine = engine_with_limits(DeliveryLimits::new(3, 0));
        for i in 0..8 {
            engine.enqueue(&message(&format!("m{i}"))).await.unwrap();
        }

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(report.delivered, 3);
        // The remainder stays queued for the next pass.
        assert_eq!(engine.queue_len().await.unwrap(), 5);

        let report = engine.drain(&transport, &mut failed).await.unwrap();
        assert_eq!(report.delivered, 3);
        assert_eq!(engine.queue_len().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_seconds_limit_stops_drain() {
        let engine = engine_with_limits(DeliveryLimits::new(0, 1));
        for i in 0..5 {
            engine.enqueue(&message(&format!("m{i}"))).await.unwrap();
        }

        // Each send takes longer than the whole time budget.
        let transport = SlowTransport::new(Duration::from_secs(2));
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(engine.queue_len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_queue_short_circuits_without_starting_transport() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(report, DrainReport::default());
        assert_eq!(transport.start_calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_started_once_and_reused() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());
        for i in 0..4 {
            engine.enqueue(&message(&format!("m{i}"))).await.unwrap();
        }

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(transport.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_recipients_accumulate_in_order() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());

        let a = OutboundMessage::new(
            vec![
                "ok@example.com".to_string(),
                "bad1@example.com".to_string(),
                "bad2@example.com".to_string(),
            ],
            "a",
            "body",
        );
        let b = OutboundMessage::new(
            vec!["ok@example.com".to_string(), "bad3@example.com".to_string()],
            "b",
            "body",
        );
        engine.enqueue(&a).await.unwrap();
        engine.enqueue(&b).await.unwrap();

        let transport = RecordingTransport::new();
        transport.fail_recipients("a", &["bad1@example.com", "bad2@example.com"]);
        transport.fail_recipients("b", &["bad3@example.com"]);

        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        // One delivered recipient from each message; the loop kept going.
        assert_eq!(report.delivered, 2);
        assert_eq!(
            failed,
            ["bad1@example.com", "bad2@example.com", "bad3@example.com"]
        );
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_skipped_not_fatal() {
        let store = Arc::new(MemoryQueueStore::new());
        let engine = SpoolEngine::new(
            store.clone(),
            Arc::new(JsonCodec),
            "spool:test",
            DeliveryLimits::unlimited(),
        );

        engine.enqueue(&message("before")).await.unwrap();
        store
            .push_tail("spool:test", b"corrupt payload".to_vec())
            .await
            .unwrap();
        engine.enqueue(&message("after")).await.unwrap();

        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(transport.sent_subjects(), ["before", "after"]);
    }

    #[tokio::test]
    async fn test_transport_start_failure_aborts_drain() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());
        engine.enqueue(&message("stuck")).await.unwrap();

        let mut failed = Vec::new();
        let result = engine.drain(&BrokenTransport, &mut failed).await;

        assert!(matches!(result, Err(SpoolError::Transport(_))));
        // Nothing was popped before the transport failed to come up.
        assert_eq!(engine.queue_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_drains_deliver_each_message_once() {
        let store = Arc::new(MemoryQueueStore::new());
        let engine = Arc::new(SpoolEngine::new(
            store,
            Arc::new(JsonCodec),
            "spool:test",
            DeliveryLimits::unlimited(),
        ));

        for i in 0..50 {
            engine.enqueue(&message(&format!("m{i}"))).await.unwrap();
        }

        let left = RecordingTransport::new();
        let right = RecordingTransport::new();
        let mut failed_left = Vec::new();
        let mut failed_right = Vec::new();

        let (a, b) = tokio::join!(
            engine.drain(&left, &mut failed_left),
            engine.drain(&right, &mut failed_right)
        );

        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.delivered + b.delivered, 50);

        let mut subjects = left.sent_subjects();
        subjects.extend(right.sent_subjects());
        subjects.sort();
        subjects.dedup();
        assert_eq!(subjects.len(), 50);
        assert_eq!(engine.queue_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lifecycle_flag_is_queryable_only() {
        let engine = engine_with_limits(DeliveryLimits::unlimited());
        assert!(!engine.is_started());

        engine.start();
        assert!(engine.is_started());

        engine.stop();
        assert!(!engine.is_started());

        // Drain works regardless of the engine's own lifecycle flag.
        let transport = RecordingTransport::new();
        let mut failed = Vec::new();
        let report = engine.drain(&transport, &mut failed).await.unwrap();
        assert_eq!(report.delivered, 0);
    }

    #[test]
    fn test_zero_limits_mean_unlimited() {
        let limits = DeliveryLimits::new(0, 0);
        assert_eq!(limits, DeliveryLimits::unlimited());
        assert_eq!(limits.max_messages(), None);
        assert_eq!(limits.max_seconds(), None);

        let limits = DeliveryLimits::new(10, 30);
        assert_eq!(limits.max_messages(), Some(10));
        assert_eq!(limits.max_seconds(), Some(30));
    }
}
