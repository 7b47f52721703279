use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;
use tracing::warn;

use super::Client;
use crate::network::HttpTransport;
use crate::network::Transport;
use crate::Error;
use crate::MirrorConfig;
use crate::Result;
use crate::SerializerKind;

pub struct ClientBuilder {
    config: MirrorConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new builder on top of `config`
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Base URL of the config service
    pub fn server_address(
        mut self,
        address: impl Into<String>,
    ) -> Self {
        self.config.server.address = address.into();
        self
    }

    pub fn app_id(
        mut self,
        app_id: impl Into<String>,
    ) -> Self {
        self.config.server.app_id = app_id.into();
        self
    }

    /// Cluster name (default: `default`)
    pub fn cluster(
        mut self,
        cluster: impl Into<String>,
    ) -> Self {
        self.config.server.cluster = cluster.into();
        self
    }

    /// Namespaces registered by [`build`](ClientBuilder::build)
    /// (default: `application`)
    pub fn namespaces(
        mut self,
        namespaces: Vec<String>,
    ) -> Self {
        self.config.server.namespaces = namespaces;
        self
    }

    /// Client IP reported to the server (default: detected outbound address)
    pub fn client_ip(
        mut self,
        ip: impl Into<String>,
    ) -> Self {
        self.config.server.client_ip = ip.into();
        self
    }

    /// Root directory of the snapshot backups
    pub fn cache_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.config.cache.cache_dir = dir.into();
        self
    }

    /// Encoding of namespaces registered without an explicit serializer
    pub fn serializer(
        mut self,
        kind: SerializerKind,
    ) -> Self {
        self.config.cache.format = kind;
        self
    }

    /// Period of the authoritative pull. `Duration::ZERO` disables it.
    pub fn refresh_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.config.retry.refresh_interval_in_secs = interval.as_secs();
        self
    }

    /// Delay after a failed long-poll (default: 2s)
    pub fn poll_retry_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.config.retry.poll_retry_delay_in_ms = delay.as_millis() as u64;
        self
    }

    /// Capacity of the change-event channel (default: 100)
    pub fn event_buffer_size(
        mut self,
        size: usize,
    ) -> Self {
        self.config.cache.event_buffer_size = size;
        self
    }

    /// Completely replaces the configuration
    ///
    /// # Warning: Configuration Override
    /// This discards everything set through the individual methods before
    /// this call.
    pub fn set_config(
        mut self,
        config: MirrorConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Replaces the HTTP transport, e.g. with a scripted one in tests
    pub fn transport(
        mut self,
        transport: Arc<dyn Transport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the configuration and registers every configured namespace.
    ///
    /// Each namespace is seeded from the server, or from its backup when the
    /// server is unreachable. A namespace that can be seeded from neither is
    /// logged and left out; the others stay usable. The background loops
    /// start with [`Client::start`].
    ///
    /// # Errors
    /// - invalid configuration
    /// - [`crate::SyncError::Initialization`] of the first namespace when
    ///   none of them could be seeded
    pub async fn build(self) -> Result<Client> {
        let (client, failures) = self.build_reporting().await?;
        for (namespace, e) in &failures {
            warn!(%namespace, "namespace left unregistered: {}", e);
        }
        Ok(client)
    }

    /// [`build`](Self::build), also returning each namespace that failed to
    /// register together with its error.
    pub async fn build_reporting(self) -> Result<(Client, Vec<(String, Error)>)> {
        let config = self.config.validate()?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.network)?),
        };

        let namespaces = config.server.namespaces.clone();
        let serializer = config.cache.format.serializer();
        let client = Client::new(config, transport)?;

        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        for namespace in namespaces {
            let name = namespace.trim().to_string();
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Err(e) = client.add_namespace(&name, serializer.clone()).await {
                error!(namespace = %name, "namespace could not be seeded: {:?}", e);
                failures.push((name, e));
            }
        }

        if !failures.is_empty() && failures.len() == seen.len() {
            client.close().await.ok();
            let (_, first) = failures.swap_remove(0);
            return Err(first);
        }

        Ok((client, failures))
    }
}
