use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// HTTP transport parameters
///
/// Two request classes share one connection pool:
/// - Pulls: short requests bounded by `request_timeout_in_ms`
/// - Long-poll: held open by the server for up to 60s, bounded by
///   `long_poll_timeout_in_ms`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Completion timeout for configuration pulls in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Completion timeout for the notification long-poll in milliseconds
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_in_ms: u64,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// Idle connections kept per host
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            long_poll_timeout_in_ms: default_long_poll_timeout(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "network.connect_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "network.request_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.long_poll_timeout_in_ms <= self.request_timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "network.long_poll_timeout_in_ms ({}) must exceed network.request_timeout_in_ms ({})",
                self.long_poll_timeout_in_ms, self.request_timeout_in_ms
            ))));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.long_poll_timeout_in_ms)
    }
}

fn default_connect_timeout() -> u64 {
    5_000
}
fn default_request_timeout() -> u64 {
    30_000
}
// the server holds a poll for 60s
fn default_long_poll_timeout() -> u64 {
    90_000
}
fn default_tcp_keepalive() -> u64 {
    90
}
fn default_pool_max_idle_per_host() -> usize {
    20
}
