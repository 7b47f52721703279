use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CLUSTER;
use crate::constants::DEFAULT_NAMESPACE;
use crate::utils::net::local_ip;
use crate::Error;
use crate::Result;

/// Remote server location and the identity this client presents to it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the config service, e.g. `http://127.0.0.1:8080`.
    /// A bare `host:port` is accepted and gets an `http://` scheme.
    #[serde(default)]
    pub address: String,

    /// Application id registered on the server
    #[serde(default)]
    pub app_id: String,

    /// Cluster name used for audience targeting
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Namespaces registered when the client is built
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,

    /// Client IP reported to the server for gray-release targeting
    #[serde(default = "default_client_ip")]
    pub client_ip: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            app_id: String::new(),
            cluster: default_cluster(),
            namespaces: default_namespaces(),
            client_ip: default_client_ip(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.address must not be empty".into(),
            )));
        }

        if self.app_id.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.app_id must not be empty".into(),
            )));
        }

        if self.cluster.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.cluster must not be empty".into(),
            )));
        }

        if self.namespaces.iter().any(|ns| ns.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "server.namespaces must not contain empty names".into(),
            )));
        }

        Ok(())
    }
}

fn default_cluster() -> String {
    DEFAULT_CLUSTER.to_string()
}
fn default_namespaces() -> Vec<String> {
    vec![DEFAULT_NAMESPACE.to_string()]
}
fn default_client_ip() -> String {
    local_ip().map(|ip| ip.to_string()).unwrap_or_default()
}
