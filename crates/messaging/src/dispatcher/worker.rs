use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};

use super::command::QueueCommand;
use super::config::DispatcherConfig;
use crate::broker::{BrokerConnection, CONTENT_TYPE_JSON};
use crate::errors::Result;

/// Single consumer of the dispatcher queue.
///
/// Commands are handled strictly one at a time in queue order, so broker
/// order equals enqueue order. Failures are logged and the command dropped;
/// nothing is reported back to the producer. When `shutdown` fires the queue
/// is closed to new commands and whatever is already queued is drained.
///
/// `handled` is bumped once a command's publish has returned, whatever the
/// outcome.
pub(crate) async fn run(
    mut rx: mpsc::Receiver<QueueCommand>,
    mut shutdown: watch::Receiver<bool>,
    broker: Arc<dyn BrokerConnection>,
    config: DispatcherConfig,
    handled: Arc<AtomicUsize>,
) {
    info!(
        "Event dispatcher worker started (exchange '{}', capacity {})",
        config.exchange, config.capacity
    );

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => handle(command, broker.as_ref(), &config, &handled).await,
                None => break,
            },
            _ = shutdown.changed() => {
                rx.close();
                debug!("Event dispatcher closed to new commands; draining queue");
                while let Some(command) = rx.recv().await {
                    handle(command, broker.as_ref(), &config, &handled).await;
                }
                break;
            }
        }
    }

    info!("Event dispatcher worker stopped");
}

async fn handle(
    command: QueueCommand,
    broker: &dyn BrokerConnection,
    config: &DispatcherConfig,
    handled: &AtomicUsize,
) {
    let routing_key = command.routing_key().to_string();
    match publish(command, broker, config).await {
        Ok(()) => debug!("Published event '{}' to '{}'", routing_key, config.exchange),
        Err(e) => error!("Dropping event '{}': {}", routing_key, e),
    }
    handled.fetch_add(1, Ordering::SeqCst);
}

/// Serializes and publishes one command, retrying publish failures inline.
async fn publish(
    command: QueueCommand,
    broker: &dyn BrokerConnection,
    config: &DispatcherConfig,
) -> Result<()> {
    let (routing_key, body) = command.into_message();
    let body = body?;

    let mut backoff = config.retry_backoff;
    let mut attempt = 0;
    loop {
        match broker
            .publish(&config.exchange, &routing_key, CONTENT_TYPE_JSON, body.clone())
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) if attempt < config.publish_retries => {
                attempt += 1;
                warn!(
                    "Publishing event '{}' failed (attempt {}): {}; retrying in {:?}",
                    routing_key, attempt, e, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(e) => return Err(e.into()),
        }
    }
}
