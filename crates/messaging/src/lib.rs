//! XM Messaging - broker connection and the asynchronous event dispatcher.
//!
//! ```text
//!  request handlers ──dispatch──► bounded queue ──► worker ──publish──► broker
//! ```
//!
//! The [`broker::BrokerConnection`] trait hides the transport. The production
//! backend is NATS JetStream; [`broker::InMemoryBroker`] records messages for
//! tests and local runs.

pub mod broker;
pub mod dispatcher;
pub mod errors;

pub use broker::{
    BrokerConnection, ConnectionState, ExchangeKind, InMemoryBroker, NatsBrokerConnection,
    NatsConfig, PublishedMessage, CONTENT_TYPE_JSON,
};
pub use dispatcher::{
    BackpressurePolicy, DispatchOutcome, Dispatcher, DispatcherConfig, EventDispatcher,
    QueueCommand,
};
pub use errors::{BrokerError, DispatchError};
