use std::time::Duration;

/// Default name of the topic exchange events are published to.
pub const DEFAULT_EXCHANGE: &str = "xm_exchange";

/// Default dispatcher queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;

/// What a dispatch does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait up to `timeout` for space, then fail with `DispatchError::Backpressure`.
    Block { timeout: Duration },
    /// Drop the command immediately and log a warning.
    DropWithWarning,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        BackpressurePolicy::Block {
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub exchange: String,
    pub capacity: usize,
    pub policy: BackpressurePolicy,
    /// Extra publish attempts per command after the first failure.
    pub publish_retries: u32,
    /// Delay before the first retry; doubles on every further attempt.
    pub retry_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            policy: BackpressurePolicy::default(),
            publish_retries: 0,
            retry_backoff: Duration::from_millis(100),
        }
    }
}
