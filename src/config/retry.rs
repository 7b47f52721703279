use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Cadence of the background loops
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RetryPolicy {
    /// Fixed delay after a failed long-poll (unit: milliseconds).
    /// A 304 answer is not a failure and is retried immediately.
    #[serde(default = "default_poll_retry_delay_ms")]
    pub poll_retry_delay_in_ms: u64,

    /// Interval of the release-key keyed full pull per namespace
    /// (unit: seconds). 0 disables the periodic pull.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_in_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_retry_delay_in_ms: default_poll_retry_delay_ms(),
            refresh_interval_in_secs: default_refresh_interval_secs(),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.poll_retry_delay_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry.poll_retry_delay_in_ms must be greater than 0".into(),
            )));
        }
        Ok(())
    }

    pub fn poll_retry_delay(&self) -> Duration {
        Duration::from_millis(self.poll_retry_delay_in_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_in_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_poll_retry_delay_ms() -> u64 {
    2_000
}
fn default_refresh_interval_secs() -> u64 {
    300
}
