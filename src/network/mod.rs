//! HTTP access to the configuration service.
//!
//! [`Transport`] is the single seam between the sync loops and the wire:
//! it performs a GET with a per-request deadline and classifies the answer.
//! [`Endpoints`] builds the three resource URLs the loops need.
mod endpoints;
mod http_transport;

pub use endpoints::*;
pub use http_transport::*;


use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use url::Url;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issues a GET against `url`, giving up after `timeout`.
    ///
    /// # Returns
    /// - `Ok(body)` on status 200
    /// - [`crate::NetworkError::NotModified`] on status 304
    /// - [`crate::NetworkError::UnexpectedStatus`] on any other status
    /// - [`crate::NetworkError::Timeout`] when the deadline passes
    /// - [`crate::NetworkError::Transport`] on connection or body failures
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Bytes>;
}
