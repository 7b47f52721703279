use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::EventSink;
use super::NamespaceFetcher;
use crate::cache::CacheStore;
use crate::cache::Snapshot;
use crate::utils::async_task::spawn_task;
use crate::Namespace;
use crate::Result;
use crate::SyncError;

/// Drives one namespace: reacts to notification signals and refresh ticks,
/// reconciles the fetched content into the cache and emits the change-set.
///
/// Exactly one reaction loop runs per watcher, so at most one
/// fetch-and-reconcile is in flight for the namespace.
pub struct NamespaceWatcher {
    namespace: Namespace,
    fetcher: NamespaceFetcher,
    store: Arc<CacheStore>,
    sink: EventSink,
    refresh_interval: Option<Duration>,

    /// Taken by the first `start`
    signal: Mutex<Option<mpsc::Receiver<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    token: CancellationToken,
}

impl NamespaceWatcher {
    /// Seeds the namespace and returns a watcher ready to start.
    ///
    /// Tries an authoritative pull first, then the on-disk backup. The
    /// change-set of this initial seed is not emitted.
    ///
    /// # Errors
    /// [`SyncError::Initialization`] when neither source yields a snapshot.
    /// The cache entry must already be registered in `store`.
    pub async fn new(
        fetcher: NamespaceFetcher,
        store: Arc<CacheStore>,
        sink: EventSink,
        signal: mpsc::Receiver<()>,
        refresh_interval: Option<Duration>,
        token: CancellationToken,
    ) -> Result<Self> {
        let namespace = fetcher.namespace().clone();

        let remote = match fetcher.fetch_authoritative(None).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err("server answered not-modified to an unkeyed pull".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match remote {
            Ok(snapshot) => {
                store.reconcile(snapshot)?;
                if let Err(e) = store.dump(namespace.name()) {
                    warn!(%namespace, "initial snapshot not persisted: {:?}", e);
                }
                info!(%namespace, release_key = ?store.release_key(namespace.name()), "seeded from server");
            }
            Err(remote_reason) => {
                warn!(%namespace, "initial pull failed, seeding from disk: {}", remote_reason);
                if let Err(e) = store.load_backup(namespace.name()) {
                    return Err(SyncError::Initialization {
                        namespace: namespace.name().to_string(),
                        reason: format!("remote: {remote_reason}; disk: {e}"),
                    }
                    .into());
                }
                info!(%namespace, release_key = ?store.release_key(namespace.name()), "seeded from disk");
            }
        }

        Ok(Self {
            namespace,
            fetcher,
            store,
            sink,
            refresh_interval,
            signal: Mutex::new(Some(signal)),
            handle: Mutex::new(None),
            token,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawns the reaction loop. Later calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        let Some(signal) = self.signal.lock().take() else {
            trace!(namespace = %self.namespace, "watcher already started");
            return;
        };

        let watcher = self.clone();
        let handle = spawn_task(&format!("watcher:{}", self.namespace), async move {
            watcher.run(signal).await;
            Ok(())
        });
        *self.handle.lock() = Some(handle);
    }

    /// Cancels the loop and waits for it to exit.
    pub async fn stop(&self) -> Result<()> {
        self.token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }

    async fn run(
        &self,
        mut signal: mpsc::Receiver<()>,
    ) {
        debug!(namespace = %self.namespace, refresh = ?self.refresh_interval, "watcher loop started");

        let mut refresh = self.refresh_interval.map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                received = signal.recv() => match received {
                    Some(()) => {
                        if self.cancellable(self.on_signal()).await.is_none() {
                            break;
                        }
                    }
                    None => {
                        debug!(namespace = %self.namespace, "signal line closed");
                        break;
                    }
                },
                _ = next_tick(&mut refresh) => {
                    if self.cancellable(self.on_refresh()).await.is_none() {
                        break;
                    }
                }
            }
        }

        debug!(namespace = %self.namespace, "watcher loop stopped");
    }

    async fn cancellable<F: Future>(
        &self,
        fut: F,
    ) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Cache-serving pull after a notification.
    pub(crate) async fn on_signal(&self) {
        match self.fetcher.fetch_cached().await {
            Ok(snapshot) => self.apply(snapshot),
            Err(e) => warn!(namespace = %self.namespace, "pull after notification failed: {:?}", e),
        }
    }

    /// Release-key keyed pull. A 304 leaves everything untouched.
    pub(crate) async fn on_refresh(&self) {
        let release_key = self.store.release_key(self.namespace.name());
        match self.fetcher.fetch_authoritative(release_key.as_deref()).await {
            Ok(Some(snapshot)) => self.apply(snapshot),
            Ok(None) => debug!(namespace = %self.namespace, "periodic refresh: not modified"),
            Err(e) => warn!(namespace = %self.namespace, "periodic refresh failed: {:?}", e),
        }
    }

    fn apply(
        &self,
        snapshot: Snapshot,
    ) {
        let event = match self.store.reconcile(snapshot) {
            Ok(event) => event,
            Err(e) => {
                warn!(namespace = %self.namespace, "reconcile failed: {:?}", e);
                return;
            }
        };

        if event.is_empty() {
            trace!(namespace = %self.namespace, "content unchanged");
            return;
        }

        debug!(namespace = %self.namespace, changes = event.len(), "namespace changed");
        self.sink.emit(event);
        if let Err(e) = self.store.dump(self.namespace.name()) {
            warn!(namespace = %self.namespace, "snapshot not persisted: {:?}", e);
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl std::fmt::Debug for NamespaceWatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NamespaceWatcher")
            .field("namespace", &self.namespace)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}
