//! Asynchronous event dispatch.
//!
//! [`EventDispatcher`] decouples request handlers from the broker: a dispatch
//! only enqueues a [`QueueCommand`] on a bounded channel and returns, while a
//! single background worker serializes and publishes commands in order.
//! Delivery is at-most-once; a command that fails to serialize or publish is
//! logged and dropped.

mod command;
mod config;
mod worker;

pub use command::QueueCommand;
pub use config::{BackpressurePolicy, DispatcherConfig, DEFAULT_EXCHANGE, DEFAULT_QUEUE_CAPACITY};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::broker::{BrokerConnection, ExchangeKind};
use crate::errors::{BrokerError, DispatchError, Result};

/// Immediate result of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued for publishing.
    Enqueued,
    /// Queue was full and the policy is `DropWithWarning`.
    Dropped,
}

/// Anything that accepts outbound commands.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, command: QueueCommand) -> Result<DispatchOutcome>;
}

pub struct EventDispatcher {
    tx: mpsc::Sender<QueueCommand>,
    policy: BackpressurePolicy,
    closed: AtomicBool,
    /// Commands accepted onto the queue.
    accepted: AtomicUsize,
    /// Commands the worker finished with, published or dropped.
    handled: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Declares the exchange and starts the worker.
    ///
    /// Fails if the exchange cannot be declared; the caller is expected to
    /// abort startup.
    pub async fn start(
        broker: Arc<dyn BrokerConnection>,
        config: DispatcherConfig,
    ) -> std::result::Result<Self, BrokerError> {
        broker
            .declare_exchange(&config.exchange, ExchangeKind::Topic, true)
            .await?;

        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let policy = config.policy;
        let handled = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(worker::run(
            rx,
            shutdown_rx,
            broker,
            config,
            handled.clone(),
        ));

        Ok(Self {
            tx,
            policy,
            closed: AtomicBool::new(false),
            accepted: AtomicUsize::new(0),
            handled,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueues `payload` for publishing under `routing_key`.
    pub async fn dispatch_event<P>(&self, routing_key: &str, payload: P) -> Result<DispatchOutcome>
    where
        P: Serialize + Send + 'static,
    {
        self.dispatch(QueueCommand::new(routing_key, payload)).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn enqueued(&self) -> DispatchOutcome {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        DispatchOutcome::Enqueued
    }

    /// Number of commands waiting for the worker.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Stops accepting commands and drains the queue for at most `grace`.
    ///
    /// When the grace period ends the worker is aborted. Every accepted
    /// command it had not finished with is discarded, including one whose
    /// publish was still awaiting the broker; that count is logged and
    /// returned. Calling this more than once is harmless.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);

        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut worker) = worker else {
            return 0;
        };

        match tokio::time::timeout(grace, &mut worker).await {
            Ok(_) => {
                info!("Event dispatcher drained and stopped");
                0
            }
            Err(_) => {
                worker.abort();
                // The worker only counts a command once its publish returned.
                let _ = worker.await;
                let discarded = self
                    .accepted
                    .load(Ordering::SeqCst)
                    .saturating_sub(self.handled.load(Ordering::SeqCst));
                warn!(
                    "Event dispatcher did not drain within {:?}; discarded {} command(s)",
                    grace, discarded
                );
                discarded
            }
        }
    }
}

#[async_trait]
impl Dispatcher for EventDispatcher {
    async fn dispatch(&self, command: QueueCommand) -> Result<DispatchOutcome> {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }

        match self.policy {
            BackpressurePolicy::Block { timeout } => {
                match self.tx.send_timeout(command, timeout).await {
                    Ok(()) => Ok(self.enqueued()),
                    Err(SendTimeoutError::Timeout(command)) => {
                        warn!(
                            "Event '{}' rejected: dispatcher queue full for {:?}",
                            command.routing_key(),
                            timeout
                        );
                        Err(DispatchError::Backpressure(timeout))
                    }
                    Err(SendTimeoutError::Closed(_)) => Err(DispatchError::Closed),
                }
            }
            BackpressurePolicy::DropWithWarning => match self.tx.try_send(command) {
                Ok(()) => Ok(self.enqueued()),
                Err(TrySendError::Full(command)) => {
                    warn!(
                        "Event '{}' dropped: dispatcher queue full",
                        command.routing_key()
                    );
                    Ok(DispatchOutcome::Dropped)
                }
                Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
            },
        }
    }
}
