//! NATS JetStream broker connection.
//!
//! A topic exchange is a JetStream stream capturing every subject under
//! `<exchange>.>`; a message published with routing key `company.created` to
//! exchange `xm_exchange` lands on subject `xm_exchange.company.created`, so
//! subscribers filter with ordinary NATS wildcards. Durable exchanges use file
//! storage.
//!
//! Reconnection is handled by the client itself. Outages are reported on the
//! connection-state channel; publishes issued while disconnected fail and the
//! dispatcher logs and drops them.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::stream::{Config as StreamConfig, StorageType};
use async_nats::jetstream::Context as JetStreamContext;
use async_nats::{ConnectOptions, Event, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::{BrokerConnection, ConnectionState, ExchangeKind};
use crate::errors::BrokerError;

/// NATS connection configuration.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connection_timeout_secs: u64,
    /// JetStream ack timeout in seconds
    pub request_timeout_secs: u64,
    /// Max reconnection attempts (None = infinite)
    pub max_reconnects: Option<usize>,
    pub name: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            user: None,
            password: None,
            connection_timeout_secs: 5,
            request_timeout_secs: 10,
            max_reconnects: None,
            name: Some("xm-server".to_string()),
        }
    }
}

/// Stream backing a topic exchange. JetStream stream names may not contain
/// subject tokens, so separators and wildcards are replaced.
pub(crate) fn stream_name(exchange: &str) -> String {
    exchange
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' | ' ' | '/' | '\\' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

pub(crate) fn subject(exchange: &str, routing_key: &str) -> String {
    format!("{}.{}", exchange, routing_key)
}

/// Connection state a client event moves to, if any.
pub(crate) fn connection_state(event: &Event) -> Option<ConnectionState> {
    match event {
        Event::Connected => Some(ConnectionState::Connected),
        Event::Disconnected => Some(ConnectionState::Disconnected),
        Event::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

pub struct NatsBrokerConnection {
    jetstream: JetStreamContext,
    state: watch::Receiver<ConnectionState>,
}

impl NatsBrokerConnection {
    /// Connects to the server. Fails if the server is unreachable.
    pub async fn connect(config: NatsConfig) -> Result<Self, BrokerError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let state_tx = Arc::new(state_tx);

        let mut options = ConnectOptions::new()
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            options = options.user_and_password(user.clone(), password.clone());
        }
        if let Some(name) = &config.name {
            options = options.name(name);
        }
        if let Some(max_reconnects) = config.max_reconnects {
            options = options.max_reconnects(max_reconnects);
        }

        let events_tx = state_tx.clone();
        let options = options.event_callback(move |event| {
            let events_tx = events_tx.clone();
            async move {
                match connection_state(&event) {
                    Some(state) => {
                        match state {
                            ConnectionState::Connected => info!("Broker connection established"),
                            ConnectionState::Disconnected => {
                                warn!("Broker connection lost; client is reconnecting")
                            }
                            ConnectionState::Closed => warn!("Broker connection closed"),
                        }
                        events_tx.send_replace(state);
                    }
                    None => debug!("Broker connection event: {}", event),
                }
            }
        });

        let client = async_nats::connect_with_options(config.url.as_str(), options)
            .await
            .map_err(|e| {
                error!("Failed to connect to broker at {}: {}", config.url, e);
                BrokerError::Connect(e.to_string())
            })?;
        state_tx.send_replace(ConnectionState::Connected);
        info!("Connected to broker at {}", config.url);

        let jetstream = async_nats::jetstream::new(client);

        Ok(Self {
            jetstream,
            state: state_rx,
        })
    }

}

#[async_trait]
impl BrokerConnection for NatsBrokerConnection {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        let subjects = match kind {
            ExchangeKind::Topic => vec![format!("{}.>", name)],
        };
        let storage = if durable {
            StorageType::File
        } else {
            StorageType::Memory
        };

        let stream_config = StreamConfig {
            name: stream_name(name),
            subjects,
            storage,
            num_replicas: 1,
            ..Default::default()
        };

        self.jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| BrokerError::Declare(e.to_string()))?;

        info!(
            "Declared {:?} exchange '{}' (durable={})",
            kind, name, durable
        );
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), BrokerError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", content_type);

        let ack = self
            .jetstream
            .publish_with_headers(subject(exchange, routing_key), headers, body)
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        // Wait for ack (confirms the message was stored)
        ack.await.map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    fn connection_events(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}
