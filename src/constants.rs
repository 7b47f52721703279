// -
// Protocol

/// Namespace every Apollo application owns implicitly
pub const DEFAULT_NAMESPACE: &str = "application";

/// Cluster used when none is configured
pub const DEFAULT_CLUSTER: &str = "default";

/// Notification id of a namespace that has never been notified
pub const DEFAULT_NOTIFICATION_ID: i64 = -1;

/// Key holding the raw document of non-properties namespaces
pub const CONTENT_KEY: &str = "content";

// -
// Bootstrap environment

pub(crate) const ENV_HOST: &str = "APOLLO_HOST";
pub(crate) const ENV_APP_ID: &str = "APOLLO_APP_ID";
pub(crate) const ENV_CLUSTER: &str = "APOLLO_CLUSTER";
pub(crate) const ENV_NAMESPACE: &str = "APOLLO_NAMESPACE";

/// Separator of the namespace list in `APOLLO_NAMESPACE`
pub(crate) const NAMESPACE_SEPARATOR: char = ';';
