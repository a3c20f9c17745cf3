use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::DrainTaskConfig;
use crate::spool::{DeliveryTransport, SpoolEngine};

/// Background task that drains the spool on a fixed interval.
///
/// Each tick runs one bounded drain pass; the engine's limits decide how
/// much of the queue a single pass may consume. Store or transport failures
/// abort only the current pass, the next tick retries from the head.
pub struct DrainTask {
    config: DrainTaskConfig,
    engine: Arc<SpoolEngine>,
    transport: Arc<dyn DeliveryTransport>,
    shutdown: broadcast::Receiver<()>,
}

impl DrainTask {
    pub fn new(
        config: DrainTaskConfig,
        engine: Arc<SpoolEngine>,
        transport: Arc<dyn DeliveryTransport>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            engine,
            transport,
            shutdown,
        }
    }

    /// Run the drain loop until shutdown.
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(Duration::from_secs(self.config.interval_seconds));

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.config.interval_seconds,
            queue_key = %self.engine.queue_key(),
            "Drain task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Drain task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.drain_once().await;
                }
            }
        }

        tracing::info!("Drain task stopped");
    }

    async fn drain_once(&self) {
        let mut failed_recipients = Vec::new();

        match self
            .engine
            .drain(self.transport.as_ref(), &mut failed_recipients)
            .await
        {
            Ok(report) => {
                if !failed_recipients.is_empty() {
                    tracing::warn!(
                        failed = failed_recipients.len(),
                        recipients = ?failed_recipients,
                        "Drain pass had failed recipients"
                    );
                }
                if report.skipped > 0 {
                    tracing::warn!(
                        skipped = report.skipped,
                        "Drain pass skipped undecodable payloads"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Drain pass failed");
            }
        }
    }
}
