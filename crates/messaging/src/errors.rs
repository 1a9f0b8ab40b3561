//! Error types for the broker connection and the event dispatcher.

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the message broker.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    Connect(String),

    #[error("Exchange declaration failed: {0}")]
    Declare(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Failures reported to callers of the dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatcher queue is full; command not accepted within {0:?}")]
    Backpressure(Duration),

    #[error("Dispatcher is closed")]
    Closed,

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
