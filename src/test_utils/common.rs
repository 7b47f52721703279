use std::collections::HashMap;

use bytes::Bytes;
use serde_json::json;

use crate::Error;
use crate::NetworkError;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub(crate) fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub(crate) fn not_modified() -> Error {
    NetworkError::NotModified { url: "test".into() }.into()
}

/// A retryable failure as the transport would report an unreachable server.
pub(crate) fn transport_failure(url: &str) -> Error {
    NetworkError::UnexpectedStatus {
        status: 503,
        url: url.to_string(),
    }
    .into()
}

/// Body of a cache-serving pull
pub(crate) fn configfiles_body(pairs: &[(&str, &str)]) -> Bytes {
    Bytes::from(serde_json::to_vec(&map(pairs)).unwrap_or_default())
}

/// Body of an authoritative pull
pub(crate) fn release_body(
    namespace: &str,
    pairs: &[(&str, &str)],
    release_key: &str,
) -> Bytes {
    let body = json!({
        "appId": "app",
        "cluster": "default",
        "namespaceName": namespace,
        "configurations": map(pairs),
        "releaseKey": release_key,
    });
    Bytes::from(body.to_string())
}
