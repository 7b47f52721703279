use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Last known content of one namespace
///
/// The release key identifies the server-side release that produced
/// `configurations`. It is `None` until an authoritative pull (or a disk seed
/// that carried one) has been observed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "namespace_name")]
    pub namespace: String,

    #[serde(default)]
    pub configurations: HashMap<String, String>,

    #[serde(default)]
    pub release_key: Option<String>,
}

impl Snapshot {
    pub fn new(
        namespace: impl Into<String>,
        configurations: HashMap<String, String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            configurations,
            release_key: None,
        }
    }

    pub fn empty(namespace: impl Into<String>) -> Self {
        Self::new(namespace, HashMap::new())
    }

    pub fn with_release_key(
        mut self,
        release_key: impl Into<String>,
    ) -> Self {
        self.release_key = Some(release_key.into());
        self
    }
}
