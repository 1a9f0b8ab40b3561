//! In-process broker used by tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio::sync::watch;

use super::{BrokerConnection, ConnectionState, ExchangeKind};
use crate::errors::BrokerError;

/// A message accepted by [`InMemoryBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub body: Bytes,
}

impl PublishedMessage {
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

/// Records declared exchanges and published messages in memory.
///
/// Publishing can be switched to fail, and delivery can be paused so that
/// publishes park until [`resume`](Self::resume) is called.
pub struct InMemoryBroker {
    exchanges: Mutex<HashMap<String, (ExchangeKind, bool)>>,
    messages: Mutex<Vec<PublishedMessage>>,
    published: watch::Sender<usize>,
    paused: watch::Sender<bool>,
    state: watch::Sender<ConnectionState>,
    fail_declare: AtomicBool,
    fail_publish: AtomicBool,
    publish_attempts: AtomicUsize,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            exchanges: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            published: watch::channel(0).0,
            paused: watch::channel(false).0,
            state: watch::channel(ConnectionState::Connected).0,
            fail_declare: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            publish_attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_declare(&self, fail: bool) {
        self.fail_declare.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Parks every publish until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Simulates a connection state change.
    pub fn set_connection_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    pub fn is_declared(&self, exchange: &str) -> bool {
        self.exchanges
            .lock()
            .map(|exchanges| exchanges.contains_key(exchange))
            .unwrap_or(false)
    }

    /// Snapshot of every accepted message, in publish order.
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Number of publish calls, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.publish_attempts.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` messages were accepted or `timeout` elapses,
    /// then returns the snapshot.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> Vec<PublishedMessage> {
        let mut rx = self.published.subscribe();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|published| *published >= count)).await;
        self.messages()
    }

    fn lock_error<T>(_: T) -> BrokerError {
        BrokerError::Publish("in-memory broker state poisoned".to_string())
    }
}

#[async_trait]
impl BrokerConnection for InMemoryBroker {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        if self.fail_declare.load(Ordering::SeqCst) {
            return Err(BrokerError::Declare(format!(
                "exchange '{}' rejected by broker",
                name
            )));
        }
        self.exchanges
            .lock()
            .map_err(Self::lock_error)?
            .insert(name.to_string(), (kind, durable));
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), BrokerError> {
        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        self.publish_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("broker unavailable".to_string()));
        }
        if !self.is_declared(exchange) {
            return Err(BrokerError::Publish(format!(
                "exchange '{}' is not declared",
                exchange
            )));
        }

        let total = {
            let mut messages = self.messages.lock().map_err(Self::lock_error)?;
            messages.push(PublishedMessage {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                content_type: content_type.to_string(),
                body,
            });
            messages.len()
        };
        debug!("In-memory broker accepted {} on {}", routing_key, exchange);
        self.published.send_replace(total);
        Ok(())
    }

    fn connection_events(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}
