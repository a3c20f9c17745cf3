use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mail_spool::client::{self, ConnectOptions};
use mail_spool::codec::{JsonCodec, MessageCodec};
use mail_spool::config::Settings;
use mail_spool::spool::{DeliveryLimits, DeliveryTransport, SpoolEngine, TracingTransport};
use mail_spool::store::create_queue_store;
use mail_spool::tasks::DrainTask;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Provision the store connection; the memory backend needs none
    let (connection, codec) = if settings.spool.backend == "redis" {
        let spool_client =
            client::connect(&settings.redis.url, ConnectOptions::default()).await?;
        (Some(spool_client.connection), spool_client.codec)
    } else {
        (None, Arc::new(JsonCodec) as Arc<dyn MessageCodec>)
    };

    // Build the spool engine
    let store = create_queue_store(&settings.spool, connection);
    let limits = DeliveryLimits::new(
        settings.spool.max_messages_per_drain,
        settings.spool.max_seconds_per_drain,
    );
    let engine = Arc::new(SpoolEngine::new(
        store,
        codec,
        settings.spool.queue_key.clone(),
        limits,
    ));
    engine.start();
    tracing::info!(queue_key = %settings.spool.queue_key, "Spool engine initialized");

    // Start drain task in background
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let transport: Arc<dyn DeliveryTransport> = Arc::new(TracingTransport::new());
    let drain_task = DrainTask::new(
        settings.drain.clone(),
        engine.clone(),
        transport,
        shutdown_rx,
    );
    let drain_handle = tokio::spawn(drain_task.run());

    // Run until a shutdown signal arrives
    shutdown_signal_handler(shutdown_tx).await;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = tokio::join!(drain_handle);
    engine.stop();

    tracing::info!("Spool shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Send shutdown signal to the drain task
    let _ = shutdown_tx.send(());
}
