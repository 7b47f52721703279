use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// On-disk encoding of a namespace snapshot
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// Structured text, human readable
    #[default]
    Json,
    /// Compact binary
    Bincode,
}

/// Local snapshot persistence and event delivery
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Root of the backup files, laid out as `{cache_dir}/{app_id}/{namespace}`
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Encoding used for namespaces registered without an explicit serializer
    #[serde(default)]
    pub format: SerializerKind,

    /// Capacity of the change-event channel handed to subscribers.
    /// Events produced while it is full are dropped.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            format: SerializerKind::default(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "cache.cache_dir must not be empty".into(),
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cache.event_buffer_size must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir()
}
fn default_event_buffer_size() -> usize {
    100
}
