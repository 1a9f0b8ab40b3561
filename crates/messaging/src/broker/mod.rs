//! Message broker abstraction.
//!
//! The dispatcher only needs two primitives from a broker: declaring the
//! topic exchange it publishes to, and publishing one message. Connection
//! health is observable through a `watch` channel so the owner can log or
//! react to outages without the publish path taking any lock.

mod in_memory;
mod nats;

pub use in_memory::{InMemoryBroker, PublishedMessage};
pub use nats::{NatsBrokerConnection, NatsConfig};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::errors::BrokerError;

/// Content type attached to every JSON message.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Routing construct of a declared exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Delivers to every subscriber whose pattern matches the routing key.
    Topic,
}

/// Observable state of the physical broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Closed,
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Declares `name` so that later publishes to it are routed.
    /// Declaring an existing exchange with the same settings is a no-op.
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> std::result::Result<(), BrokerError>;

    /// Publishes one message and waits until the broker has accepted it.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: Bytes,
    ) -> std::result::Result<(), BrokerError>;

    /// Connection state notifications.
    fn connection_events(&self) -> watch::Receiver<ConnectionState>;
}
