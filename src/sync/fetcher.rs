use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::Snapshot;
use crate::network::Endpoints;
use crate::network::Transport;
use crate::Namespace;
use crate::Result;

/// Body of an authoritative pull
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleasePayload {
    #[serde(default)]
    namespace_name: String,
    #[serde(default)]
    configurations: HashMap<String, String>,
    #[serde(default)]
    release_key: Option<String>,
}

/// Reads one namespace from the server through either pull path.
///
/// Both paths return the complete key set, never a delta.
#[derive(Clone)]
pub struct NamespaceFetcher {
    namespace: Namespace,
    transport: Arc<dyn Transport>,
    endpoints: Arc<Endpoints>,
    request_timeout: Duration,
}

impl NamespaceFetcher {
    pub fn new(
        namespace: Namespace,
        transport: Arc<dyn Transport>,
        endpoints: Arc<Endpoints>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            namespace,
            transport,
            endpoints,
            request_timeout,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Release-key keyed full pull.
    ///
    /// Returns `Ok(None)` when the server reports the release is unchanged.
    pub async fn fetch_authoritative(
        &self,
        release_key: Option<&str>,
    ) -> Result<Option<Snapshot>> {
        let url = self.endpoints.configs_url(self.namespace.name(), release_key)?;

        let body = match self.transport.get(&url, self.request_timeout).await {
            Ok(body) => body,
            Err(e) if e.is_not_modified() => {
                debug!(namespace = %self.namespace, ?release_key, "release unchanged");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let payload: ReleasePayload = serde_json::from_slice(&body)?;
        if !payload.namespace_name.is_empty() && payload.namespace_name != self.namespace.name() {
            debug!(
                namespace = %self.namespace,
                answered = %payload.namespace_name,
                "server answered under a different namespace name"
            );
        }

        let snapshot = Snapshot {
            namespace: self.namespace.name().to_string(),
            configurations: payload.configurations,
            release_key: payload.release_key.filter(|k| !k.is_empty()),
        };
        Ok(Some(snapshot))
    }

    /// Low-latency pull that may be answered by an upstream cache.
    ///
    /// The result carries no release key.
    pub async fn fetch_cached(&self) -> Result<Snapshot> {
        let url = self.endpoints.configfiles_url(self.namespace.name())?;
        let body = self.transport.get(&url, self.request_timeout).await?;
        let configurations: HashMap<String, String> = serde_json::from_slice(&body)?;
        Ok(Snapshot::new(self.namespace.name(), configurations))
    }
}

impl std::fmt::Debug for NamespaceFetcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NamespaceFetcher")
            .field("namespace", &self.namespace)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
