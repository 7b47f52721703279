//! Configuration mirror client
//!
//! Composes, per registered namespace, a cache entry, a notification slot
//! and a [`NamespaceWatcher`], plus the single [`NotificationPoller`] shared
//! by all of them. Everything hangs off one process-wide cancellation token.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ClientBuilder;
use crate::cache::CacheStore;
use crate::cache::Serializer;
use crate::constants::CONTENT_KEY;
use crate::constants::DEFAULT_NAMESPACE;
use crate::network::Endpoints;
use crate::network::Transport;
use crate::sync::ChangeEventReceiver;
use crate::sync::EventSink;
use crate::sync::NamespaceFetcher;
use crate::sync::NamespaceWatcher;
use crate::utils::async_task::spawn_task;
use crate::MirrorConfig;
use crate::Namespace;
use crate::NotificationPoller;
use crate::NotificationRegistry;
use crate::Result;
use crate::SyncError;

/// Main entry point of the configuration mirror
///
/// Reads never touch the network: they are served from the local snapshot,
/// which the background loops keep current once [`start`](Client::start)
/// has been called.
///
/// Created through the [`builder()`](Client::builder) method
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    config: MirrorConfig,
    transport: Arc<dyn Transport>,
    endpoints: Arc<Endpoints>,

    store: Arc<CacheStore>,
    registry: Arc<NotificationRegistry>,
    poller: Arc<NotificationPoller>,
    watchers: DashMap<String, Arc<NamespaceWatcher>>,

    /// Dropped on close so subscribers observe the end of the stream
    sink: Mutex<Option<EventSink>>,
    events: ChangeEventReceiver,

    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    closed: AtomicBool,
}

impl Client {
    /// Create a configured client builder
    ///
    /// Chain configuration methods before calling
    /// [`build()`](ClientBuilder::build).
    pub fn builder(config: MirrorConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Builds a client with no namespace registered yet.
    pub(super) fn new(
        config: MirrorConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoints = Arc::new(Endpoints::from_config(&config.server)?);
        let store = Arc::new(CacheStore::new());
        let registry = Arc::new(NotificationRegistry::new());
        let poller = Arc::new(NotificationPoller::new(
            transport.clone(),
            endpoints.clone(),
            registry.clone(),
            config.network.long_poll_timeout(),
            config.retry.poll_retry_delay(),
        ));
        let (sink, events) = EventSink::channel(config.cache.event_buffer_size);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                endpoints,
                store,
                registry,
                poller,
                watchers: DashMap::new(),
                sink: Mutex::new(Some(sink)),
                events,
                shutdown: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    /// Value of `key` in the default namespace
    pub fn get(
        &self,
        key: &str,
    ) -> Option<String> {
        self.get_value(DEFAULT_NAMESPACE, key)
    }

    /// Value of `key` in `namespace`.
    ///
    /// For document namespaces (`.json`, `.yaml`, ...) the whole document
    /// is returned whatever `key` is.
    pub fn get_value(
        &self,
        namespace: &str,
        key: &str,
    ) -> Option<String> {
        let entry = self.inner.store.entry(namespace).ok()?;
        self.inner.store.get(namespace, entry.namespace().lookup_key(key))
    }

    /// Raw document of a non-properties namespace
    pub fn get_content(
        &self,
        namespace: &str,
    ) -> Option<String> {
        self.inner.store.get(namespace, CONTENT_KEY)
    }

    pub fn all_keys(
        &self,
        namespace: &str,
    ) -> Vec<String> {
        self.inner.store.keys(namespace)
    }

    /// Last observed release key, empty when none is known
    pub fn release_key(
        &self,
        namespace: &str,
    ) -> String {
        self.inner.store.release_key(namespace).unwrap_or_default()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.inner.store.namespaces()
    }

    /// Change events of every namespace.
    ///
    /// All receivers share one queue. Events produced while the queue is
    /// full are dropped.
    pub fn subscribe(&self) -> ChangeEventReceiver {
        self.inner.events.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst) && !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Registers `namespace` with its backup at `{cache_dir}/{app_id}/{namespace}`.
    pub async fn add_namespace(
        &self,
        namespace: &str,
        serializer: Arc<dyn Serializer>,
    ) -> Result<()> {
        let path = self
            .inner
            .config
            .cache
            .cache_dir
            .join(&self.inner.config.server.app_id)
            .join(namespace.trim());
        self.add_namespace_with_path(namespace, serializer, path).await
    }

    /// Registers `namespace` and seeds it.
    ///
    /// The watcher starts right away when the client is running. On failure
    /// nothing of the namespace is left registered.
    ///
    /// # Errors
    /// - [`SyncError::Initialization`] when neither the server nor the
    ///   backup at `path` yields a snapshot
    /// - [`SyncError::DuplicateNamespace`]
    /// - [`SyncError::Closed`]
    pub async fn add_namespace_with_path(
        &self,
        namespace: &str,
        serializer: Arc<dyn Serializer>,
        path: PathBuf,
    ) -> Result<()> {
        self.ensure_open()?;

        let namespace = Namespace::new(namespace);
        if namespace.name().is_empty() {
            return Err(SyncError::Initialization {
                namespace: String::new(),
                reason: "empty namespace name".into(),
            }
            .into());
        }
        let name = namespace.name().to_string();
        let sink = self.inner.sink.lock().clone().ok_or(SyncError::Closed)?;

        self.inner.store.register(&namespace, serializer, path)?;
        let signal = match self.inner.registry.register(&name) {
            Ok(signal) => signal,
            Err(e) => {
                self.inner.store.unregister(&name);
                return Err(e);
            }
        };

        let fetcher = NamespaceFetcher::new(
            namespace.clone(),
            self.inner.transport.clone(),
            self.inner.endpoints.clone(),
            self.inner.config.network.request_timeout(),
        );
        let watcher = match NamespaceWatcher::new(
            fetcher,
            self.inner.store.clone(),
            sink,
            signal,
            self.inner.config.retry.refresh_interval(),
            self.inner.shutdown.child_token(),
        )
        .await
        {
            Ok(watcher) => Arc::new(watcher),
            Err(e) => {
                error!(%namespace, "namespace registration failed: {:?}", e);
                self.inner.registry.unregister(&name);
                self.inner.store.unregister(&name);
                return Err(e);
            }
        };

        // Publish before reading `running`: either `start` sees this watcher
        // or this call sees `running` set. A second start is a no-op.
        self.inner.watchers.insert(name, watcher.clone());
        if self.inner.running.load(Ordering::SeqCst) {
            watcher.start();
        }
        info!(%namespace, format = ?namespace.format(), "namespace registered");
        Ok(())
    }

    /// Stops the namespace's watcher, then drops its notification slot and
    /// finally its cache entry.
    pub async fn remove_namespace(
        &self,
        namespace: &str,
    ) -> Result<()> {
        self.ensure_open()?;

        let (name, watcher) = self
            .inner
            .watchers
            .remove(namespace.trim())
            .ok_or_else(|| SyncError::UnknownNamespace(namespace.to_string()))?;

        watcher.stop().await?;
        self.inner.registry.unregister(&name);
        self.inner.store.unregister(&name);
        info!(namespace = %name, "namespace removed");
        Ok(())
    }

    /// Spawns the notification poller and every watcher loop.
    ///
    /// # Errors
    /// [`SyncError::AlreadyRunning`] on a second call
    pub fn start(&self) -> Result<()> {
        self.ensure_open()?;
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning.into());
        }

        let poller = self.inner.poller.clone();
        let token = self.inner.shutdown.child_token();
        let handle = spawn_task("notification-poller", async move { poller.run(token).await });
        self.inner.tasks.lock().push(handle);

        for watcher in self.inner.watchers.iter() {
            watcher.value().start();
        }

        info!(
            app_id = %self.inner.endpoints.app_id(),
            cluster = %self.inner.endpoints.cluster(),
            namespaces = self.inner.watchers.len(),
            "client started"
        );
        Ok(())
    }

    /// Persists every namespace
    pub fn save(&self) -> Result<()> {
        self.inner.store.save()
    }

    /// Stops every background task, persists every namespace and ends the
    /// event stream. Cached values stay readable.
    ///
    /// Shutdown always completes; a persistence failure is returned
    /// afterwards.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("client already closed");
            return Ok(());
        }

        self.inner.shutdown.cancel();

        let handles: Vec<JoinHandle<()>> = self.inner.tasks.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("background task failed: {:?}", e);
            }
        }

        let watchers: Vec<Arc<NamespaceWatcher>> = self.inner.watchers.iter().map(|w| w.value().clone()).collect();
        self.inner.watchers.clear();
        for watcher in watchers {
            if let Err(e) = watcher.stop().await {
                error!(namespace = %watcher.namespace(), "watcher failed: {:?}", e);
            }
        }

        // no watcher is left to race the final dump
        let saved = self.inner.store.save();
        if let Err(e) = &saved {
            warn!("snapshots not fully persisted on close: {:?}", e);
        }

        self.inner.sink.lock().take();
        info!("client closed");
        saved
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SyncError::Closed.into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("namespaces", &self.namespaces())
            .field("running", &self.is_running())
            .finish()
    }
}
