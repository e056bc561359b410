//! Sender configuration: defaults, builder-style overrides and environment overlay.

use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::sender::queue::DEFAULT_QUEUE_CAPACITY;

const ENV_QUEUE_CAPACITY: &str = "OSC_SENDER_QUEUE_CAPACITY";
const ENV_BIND: &str = "OSC_SENDER_BIND";
const ENV_IDLE_WAIT_US: &str = "OSC_SENDER_IDLE_WAIT_US";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Bundles the queue can hold before `try_send` starts dropping.
    pub queue_capacity: usize,
    /// Local address for the sending socket; port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// How long the drain thread parks when the queue is empty.
    pub idle_wait: Duration,
    /// Upper bound on waiting for socket writability before a send counts as failed.
    pub send_timeout: Duration,
    /// SO_SNDBUF override; `None` keeps the OS default.
    pub send_buffer_size: Option<usize>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bind_addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            idle_wait: Duration::from_millis(1),
            send_timeout: Duration::from_millis(100),
            send_buffer_size: None,
        }
    }
}

impl SenderConfig {
    /// Defaults overlaid with `OSC_SENDER_*` environment variables.
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same overlay as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_var::<usize>(&lookup, ENV_QUEUE_CAPACITY) {
            if capacity > 0 {
                config.queue_capacity = capacity;
            } else {
                warn!("{} must be > 0, keeping {}", ENV_QUEUE_CAPACITY, config.queue_capacity);
            }
        }
        if let Some(bind) = read_var::<SocketAddr>(&lookup, ENV_BIND) {
            config.bind_addr = bind;
        }
        if let Some(us) = read_var::<u64>(&lookup, ENV_IDLE_WAIT_US) {
            config.idle_wait = Duration::from_micros(us);
        }
        config
    }

    /// Panics if `capacity` is zero.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        self.queue_capacity = capacity;
        self
    }

    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_send_buffer_size(mut self, size: usize) -> Self {
        self.send_buffer_size = Some(size);
        self
    }
}

fn read_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
