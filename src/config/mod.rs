//! Configuration management module for the configuration mirror.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - The classic `APOLLO_HOST` / `APOLLO_APP_ID` bootstrap variables
//! - Component-wise validation
mod cache;
mod network;
mod retry;
mod server;
pub use cache::*;
pub use network::*;
pub use retry::*;
pub use server::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CLUSTER;
use crate::constants::ENV_APP_ID;
use crate::constants::ENV_CLUSTER;
use crate::constants::ENV_HOST;
use crate::constants::ENV_NAMESPACE;
use crate::constants::NAMESPACE_SEPARATOR;
use crate::Error;
use crate::Result;

/// Main configuration container for the mirror client
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with the `APOLLO__` prefix (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct MirrorConfig {
    /// Remote server location and application identity
    #[serde(default)]
    pub server: ServerConfig,
    /// HTTP transport parameters
    #[serde(default)]
    pub network: NetworkConfig,
    /// Retry and refresh cadence of the background loops
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Local snapshot persistence and event delivery
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Debug for MirrorConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("server", &self.server)
            .field("cache", &self.cache)
            .finish()
    }
}

impl MirrorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `APOLLO__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("APOLLO__SERVER__APP_ID", "sample-app");
    /// let cfg = MirrorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("APOLLO")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true)
                .list_separator(";")
                .with_list_parse_key("server.namespaces"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APOLLO")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(";")
                    .with_list_parse_key("server.namespaces"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Overlays the bootstrap variables used by container deployments:
    /// `APOLLO_HOST`, `APOLLO_APP_ID`, `APOLLO_CLUSTER` and the
    /// semicolon-delimited `APOLLO_NAMESPACE`.
    ///
    /// Host and app id must be known after the overlay, either from these
    /// variables or from an earlier layer.
    pub fn with_bootstrap_env(mut self) -> Result<Self> {
        if let Some(host) = non_empty_var(ENV_HOST) {
            self.server.address = host;
        }
        if let Some(app_id) = non_empty_var(ENV_APP_ID) {
            self.server.app_id = app_id;
        }
        if let Some(cluster) = non_empty_var(ENV_CLUSTER) {
            self.server.cluster = cluster;
        }
        if self.server.cluster.trim().is_empty() {
            self.server.cluster = DEFAULT_CLUSTER.to_string();
        }
        if let Some(namespaces) = non_empty_var(ENV_NAMESPACE) {
            self.server.namespaces = namespaces
                .split(NAMESPACE_SEPARATOR)
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect();
        }

        if self.server.address.trim().is_empty() || self.server.app_id.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(format!(
                "{ENV_HOST} and {ENV_APP_ID} are required"
            ))));
        }
        Ok(self)
    }

    /// Validates configuration and returns validated instance.
    ///
    /// Consumes self and performs validation of all subsystems. Must be called
    /// after all configuration overrides to ensure the final config is valid.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.network.validate()?;
        self.retry.validate()?;
        self.cache.validate()?;
        Ok(self)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
