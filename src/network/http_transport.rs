use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::StatusCode;
use tracing::debug;
use tracing::trace;
use url::Url;

use super::Transport;
use crate::NetworkConfig;
use crate::NetworkError;
use crate::Result;

/// [`Transport`] over a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("apollo-mirror/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(Duration::from_secs(config.tcp_keepalive_in_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Bytes> {
        trace!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, url, timeout))?;

        match response.status() {
            StatusCode::OK => Ok(response.bytes().await.map_err(|e| classify(e, url, timeout))?),
            StatusCode::NOT_MODIFIED => Err(NetworkError::NotModified { url: url.to_string() }.into()),
            status => {
                debug!("GET {} answered {}", url, status);
                Err(NetworkError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                }
                .into())
            }
        }
    }
}

fn classify(
    e: reqwest::Error,
    url: &Url,
    timeout: Duration,
) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
            duration: timeout,
        }
    } else {
        NetworkError::Transport(e)
    }
}
