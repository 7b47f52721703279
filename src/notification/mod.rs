//! Long-poll notification tracking
//!
//! ```text
//! NotificationPoller::run
//!   GET notifications/v2 (every registered namespace + last id)
//!     304  -> loop immediately
//!     200  -> NotificationRegistry::apply -> try_send(per-namespace signal)
//!     err  -> sleep(retry delay) -> loop
//! ```
//!
//! A namespace signal is a capacity-1 channel: several notifications arriving
//! before the watcher reacts coalesce into one pending signal.
mod poller;
mod registry;

pub use poller::*;
pub use registry::*;


use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Last observed notification id of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub namespace_name: String,
    pub notification_id: i64,
}

impl Notification {
    pub fn new(
        namespace_name: impl Into<String>,
        notification_id: i64,
    ) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            notification_id,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}
