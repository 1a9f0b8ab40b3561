use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Context};
use xm_messaging::{BackpressurePolicy, DispatcherConfig, NatsConfig};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub broker_url: String,
    pub broker_user: Option<String>,
    pub broker_password: Option<String>,
    pub exchange: String,
    pub queue_capacity: usize,
    pub queue_policy: BackpressurePolicy,
    pub publish_retries: u32,
    pub shutdown_grace: Duration,
    pub origin_country: String,
    pub ip_location_url: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment, after loading a
    /// `.env` file if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|value| value.parse().ok())
                .unwrap_or(default)
        };

        let listen_addr: SocketAddr = var("XM_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid XM_LISTEN_ADDR")?;

        let queue_timeout = Duration::from_millis(number("XM_QUEUE_TIMEOUT_MS", 5000));
        let queue_policy = match var("XM_QUEUE_POLICY", "block").to_ascii_lowercase().as_str() {
            "block" => BackpressurePolicy::Block {
                timeout: queue_timeout,
            },
            "drop" => BackpressurePolicy::DropWithWarning,
            other => bail!("Invalid XM_QUEUE_POLICY '{}': expected 'block' or 'drop'", other),
        };

        Ok(Self {
            listen_addr,
            db_path: var("XM_DB_PATH", "./db/xm.db"),
            broker_url: var("XM_BROKER_URL", "nats://localhost:4222"),
            broker_user: lookup("XM_BROKER_USER").filter(|s| !s.is_empty()),
            broker_password: lookup("XM_BROKER_PASSWORD").filter(|s| !s.is_empty()),
            exchange: var("XM_EXCHANGE", xm_messaging::dispatcher::DEFAULT_EXCHANGE),
            queue_capacity: number("XM_QUEUE_CAPACITY", 200) as usize,
            queue_policy,
            publish_retries: number("XM_PUBLISH_RETRIES", 0) as u32,
            shutdown_grace: Duration::from_millis(number("XM_SHUTDOWN_GRACE_MS", 10000)),
            origin_country: var("XM_ORIGIN_COUNTRY", "CY"),
            ip_location_url: var("XM_IP_LOCATION_URL", "https://ipapi.co"),
            request_timeout: Duration::from_millis(number("XM_REQUEST_TIMEOUT_MS", 30000)),
        })
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            exchange: self.exchange.clone(),
            capacity: self.queue_capacity,
            policy: self.queue_policy,
            publish_retries: self.publish_retries,
            ..Default::default()
        }
    }

    pub fn nats_config(&self) -> NatsConfig {
        NatsConfig {
            url: self.broker_url.clone(),
            user: self.broker_user.clone(),
            password: self.broker_password.clone(),
            ..Default::default()
        }
    }
}
