use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Notification;
use crate::constants::DEFAULT_NOTIFICATION_ID;
use crate::Result;
use crate::SyncError;

#[derive(Debug)]
struct Slot {
    notification_id: i64,
    signal: mpsc::Sender<()>,
}

/// Namespace → last notification id, plus the signal line to its watcher
///
/// Shared between the poller (reads the id list, applies updates) and the
/// registration path (adds and removes slots) without external locking.
#[derive(Debug, Default)]
pub struct NotificationRegistry {
    slots: DashMap<String, Slot>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot starting at the "never notified" id and returns the
    /// receiving end of its signal.
    pub fn register(
        &self,
        namespace: &str,
    ) -> Result<mpsc::Receiver<()>> {
        match self.slots.entry(namespace.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SyncError::DuplicateNamespace(namespace.to_string()).into())
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(1);
                slot.insert(Slot {
                    notification_id: DEFAULT_NOTIFICATION_ID,
                    signal: tx,
                });
                trace!(namespace, "notification slot registered");
                Ok(rx)
            }
        }
    }

    /// Drops the slot. Its watcher observes a closed signal channel.
    pub fn unregister(
        &self,
        namespace: &str,
    ) -> bool {
        self.slots.remove(namespace).is_some()
    }

    pub fn contains(
        &self,
        namespace: &str,
    ) -> bool {
        self.slots.contains_key(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn notification_id(
        &self,
        namespace: &str,
    ) -> Option<i64> {
        self.slots.get(namespace).map(|s| s.notification_id)
    }

    /// Current id of every registered namespace, sorted by name.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut list: Vec<Notification> = self
            .slots
            .iter()
            .map(|s| Notification::new(s.key().clone(), s.notification_id))
            .collect();
        list.sort_by(|a, b| a.namespace_name.cmp(&b.namespace_name));
        list
    }

    /// Records the ids of a long-poll answer and signals their watchers.
    ///
    /// Namespaces removed since the request was issued are ignored.
    /// Returns the names that were signalled.
    pub fn apply(
        &self,
        updates: &[Notification],
    ) -> Vec<String> {
        let mut signalled = Vec::with_capacity(updates.len());

        for update in updates {
            let Some(mut slot) = self.slots.get_mut(&update.namespace_name) else {
                debug!(namespace = %update.namespace_name, "notification for unregistered namespace ignored");
                continue;
            };
            slot.notification_id = update.notification_id;

            match slot.signal.try_send(()) {
                Ok(()) => {
                    trace!(
                        namespace = %update.namespace_name,
                        notification_id = update.notification_id,
                        "namespace signalled"
                    );
                    signalled.push(update.namespace_name.clone());
                }
                Err(TrySendError::Full(())) => {
                    // previous signal not consumed yet; the watcher pulls latest content anyway
                    trace!(namespace = %update.namespace_name, "signal already pending");
                    signalled.push(update.namespace_name.clone());
                }
                Err(TrySendError::Closed(())) => {
                    warn!(namespace = %update.namespace_name, "watcher gone, signal dropped");
                }
            }
        }

        signalled
    }
}
