use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tracing::trace;
use tracing::warn;

use crate::diff::ChangeEvent;

/// Producing end of the change-event channel.
///
/// Delivery never waits: when the buffer is full the event is dropped. The
/// content is still in the cache and on disk, so a consumer that missed a
/// delta recovers by re-reading current values.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ChangeEvent>,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (EventSink, ChangeEventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            EventSink { tx },
            ChangeEventReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Hands `event` to the consumer. Empty events are never delivered.
    ///
    /// Returns whether the event was queued.
    pub fn emit(
        &self,
        event: ChangeEvent,
    ) -> bool {
        if event.is_empty() {
            return false;
        }

        let namespace = event.namespace.clone();
        let changes = event.len();
        match self.tx.try_send(event) {
            Ok(()) => {
                trace!(%namespace, changes, "change event queued");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(%namespace, changes, "change event dropped: consumer is behind");
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!(%namespace, "change event dropped: channel closed");
                false
            }
        }
    }
}

/// Consuming end of the change-event channel.
///
/// Clones share one queue: each event goes to exactly one of them.
#[derive(Debug, Clone)]
pub struct ChangeEventReceiver {
    rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl ChangeEventReceiver {
    /// Waits for the next event. `None` once the client is closed and the
    /// buffer is drained.
    pub async fn recv(&self) -> Option<ChangeEvent> {
        self.rx.lock().await.recv().await
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}
