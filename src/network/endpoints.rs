use url::Url;

use crate::constants::DEFAULT_CLUSTER;
use crate::utils::net::address_str;
use crate::NetworkError;
use crate::Notification;
use crate::Result;
use crate::ServerConfig;

/// Resource locations for one application on one server.
///
/// Every identifier is inserted as an encoded path segment or query pair,
/// never concatenated.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    app_id: String,
    cluster: String,
    client_ip: String,
}

impl Endpoints {
    pub fn new(
        address: &str,
        app_id: impl Into<String>,
        cluster: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(&address_str(address))
            .map_err(|e| NetworkError::InvalidUrl(format!("{address}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(NetworkError::InvalidUrl(address.to_string()).into());
        }

        let mut cluster: String = cluster.into();
        if cluster.trim().is_empty() {
            cluster = DEFAULT_CLUSTER.to_string();
        }

        Ok(Self {
            base,
            app_id: app_id.into(),
            cluster,
            client_ip: client_ip.into(),
        })
    }

    pub fn from_config(server: &ServerConfig) -> Result<Self> {
        Self::new(&server.address, &server.app_id, &server.cluster, &server.client_ip)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// `{base}/notifications/v2?appId=&cluster=&notifications=<json>`
    pub fn notifications_url(
        &self,
        notifications: &[Notification],
    ) -> Result<Url> {
        let payload = serde_json::to_string(notifications)?;
        let mut url = self.with_segments(&["notifications", "v2"])?;
        url.query_pairs_mut()
            .append_pair("appId", &self.app_id)
            .append_pair("cluster", &self.cluster)
            .append_pair("notifications", &payload);
        Ok(url)
    }

    /// Cache-serving pull: `{base}/configfiles/json/{appId}/{cluster}/{namespace}?ip=`
    pub fn configfiles_url(
        &self,
        namespace: &str,
    ) -> Result<Url> {
        let mut url = self.with_segments(&["configfiles", "json", &self.app_id, &self.cluster, namespace])?;
        self.append_ip(&mut url);
        Ok(url)
    }

    /// Authoritative pull: `{base}/configs/{appId}/{cluster}/{namespace}?releaseKey=&ip=`
    pub fn configs_url(
        &self,
        namespace: &str,
        release_key: Option<&str>,
    ) -> Result<Url> {
        let mut url = self.with_segments(&["configs", &self.app_id, &self.cluster, namespace])?;
        url.query_pairs_mut().append_pair("releaseKey", release_key.unwrap_or_default());
        self.append_ip(&mut url);
        Ok(url)
    }

    fn with_segments(
        &self,
        segments: &[&str],
    ) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn append_ip(
        &self,
        url: &mut Url,
    ) {
        if !self.client_ip.is_empty() {
            url.query_pairs_mut().append_pair("ip", &self.client_ip);
        }
    }
}
