use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::Serializer;
use super::Snapshot;
use crate::diff::diff;
use crate::diff::ChangeEvent;
use crate::utils::file_io::read_file;
use crate::utils::file_io::write_file_atomically;
use crate::Namespace;
use crate::Result;
use crate::SyncError;

/// One registered namespace: its current snapshot, encoding and backup file
#[derive(Debug)]
pub struct CacheEntry {
    namespace: Namespace,

    /// Readers load the current `Arc<Snapshot>` without locking
    snapshot: ArcSwap<Snapshot>,

    serializer: Arc<dyn Serializer>,

    path: PathBuf,

    /// Serializes writers (load / reconcile) of this entry
    write_lock: Mutex<()>,

    /// Serializes dumps to `path`; they share one tmp sibling
    persist_lock: Mutex<()>,
}

impl CacheEntry {
    fn new(
        namespace: Namespace,
        serializer: Arc<dyn Serializer>,
        path: PathBuf,
    ) -> Self {
        let snapshot = ArcSwap::from_pointee(Snapshot::empty(namespace.name()));
        Self {
            namespace,
            snapshot,
            serializer,
            path,
            write_lock: Mutex::new(()),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
}

/// Namespace-partitioned store of the last known configuration
///
/// # Concurrency
/// - `get` / `keys` never block: they read an immutable `Arc<Snapshot>`.
/// - `reconcile` computes the change-set against the current snapshot and
///   publishes the replacement with a single atomic pointer swap.
/// - Writers of the same namespace are serialized by a per-entry lock;
///   different namespaces never contend.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<String, Arc<CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty entry for `namespace`.
    pub fn register(
        &self,
        namespace: &Namespace,
        serializer: Arc<dyn Serializer>,
        path: PathBuf,
    ) -> Result<()> {
        match self.entries.entry(namespace.name().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SyncError::DuplicateNamespace(namespace.name().to_string()).into())
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(
                    namespace = %namespace,
                    serializer = serializer.name(),
                    path = ?path,
                    "cache entry registered"
                );
                slot.insert(Arc::new(CacheEntry::new(namespace.clone(), serializer, path)));
                Ok(())
            }
        }
    }

    /// Releases the entry. Callers stop the namespace's watcher first.
    pub fn unregister(
        &self,
        namespace: &str,
    ) -> Option<Arc<CacheEntry>> {
        self.entries.remove(namespace).map(|(_, entry)| entry)
    }

    pub fn contains(
        &self,
        namespace: &str,
    ) -> bool {
        self.entries.contains_key(namespace)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn entry(
        &self,
        namespace: &str,
    ) -> Result<Arc<CacheEntry>> {
        self.entries
            .get(namespace)
            .map(|e| e.value().clone())
            .ok_or_else(|| SyncError::UnknownNamespace(namespace.to_string()).into())
    }

    /// Replaces the namespace's snapshot wholesale with the one stored at `path`.
    ///
    /// # Errors
    /// - [`crate::StorageError::NotFound`] when no file exists at `path`
    /// - [`crate::SerializationError`] when the bytes cannot be decoded
    ///
    /// Both leave the in-memory snapshot untouched.
    pub fn load(
        &self,
        namespace: &str,
        path: &Path,
    ) -> Result<()> {
        let entry = self.entry(namespace)?;
        let bytes = read_file(path)?;
        let mut snapshot = entry.serializer.deserialize(&bytes)?;
        // the file name is authoritative, not what the payload claims
        snapshot.namespace = namespace.to_string();

        let _guard = entry.write_lock.lock();
        debug!(
            namespace,
            keys = snapshot.configurations.len(),
            release_key = ?snapshot.release_key,
            "snapshot loaded from {:?}",
            path
        );
        entry.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    /// [`load`](Self::load) from the entry's registered backup file.
    pub fn load_backup(
        &self,
        namespace: &str,
    ) -> Result<()> {
        let path = self.entry(namespace)?.path.clone();
        self.load(namespace, &path)
    }

    pub fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> Option<String> {
        let entry = self.entries.get(namespace)?.value().clone();
        let snapshot = entry.snapshot.load();
        snapshot.configurations.get(key).cloned()
    }

    pub fn keys(
        &self,
        namespace: &str,
    ) -> Vec<String> {
        match self.entries.get(namespace).map(|e| e.value().clone()) {
            Some(entry) => entry.snapshot.load().configurations.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn snapshot(
        &self,
        namespace: &str,
    ) -> Option<Arc<Snapshot>> {
        self.entries.get(namespace).map(|e| e.value().snapshot())
    }

    pub fn release_key(
        &self,
        namespace: &str,
    ) -> Option<String> {
        self.snapshot(namespace).and_then(|s| s.release_key.clone())
    }

    /// Installs `incoming` as the namespace's snapshot and returns what changed.
    ///
    /// `incoming` always carries the complete key set. When it has no release
    /// key (cache-serving pull), the previous release key is kept.
    ///
    /// The returned event may be empty; callers must not deliver empty events.
    pub fn reconcile(
        &self,
        incoming: Snapshot,
    ) -> Result<ChangeEvent> {
        let entry = self.entry(&incoming.namespace)?;

        let _guard = entry.write_lock.lock();
        let current = entry.snapshot.load_full();
        let event = diff(&incoming.namespace, &current.configurations, &incoming.configurations);

        let release_key = incoming.release_key.or_else(|| current.release_key.clone());
        let next = Snapshot {
            namespace: incoming.namespace,
            configurations: incoming.configurations,
            release_key,
        };
        trace!(
            namespace = %next.namespace,
            changes = event.len(),
            release_key = ?next.release_key,
            "snapshot reconciled"
        );
        entry.snapshot.store(Arc::new(next));

        Ok(event)
    }

    /// Writes the namespace's current snapshot to its backup file.
    ///
    /// The in-memory snapshot is never rolled back on failure.
    pub fn dump(
        &self,
        namespace: &str,
    ) -> Result<()> {
        let entry = self.entry(namespace)?;
        Self::dump_entry(&entry)
    }

    /// Dumps every namespace. Failures are logged and the first one is
    /// returned after all namespaces have been attempted.
    pub fn save(&self) -> Result<()> {
        let entries: Vec<Arc<CacheEntry>> = self.entries.iter().map(|e| e.value().clone()).collect();

        let mut first_error = None;
        for entry in entries {
            if let Err(e) = Self::dump_entry(&entry) {
                error!(namespace = %entry.namespace, "failed to persist snapshot: {:?}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn dump_entry(entry: &CacheEntry) -> Result<()> {
        let _guard = entry.persist_lock.lock();
        let snapshot = entry.snapshot.load_full();
        let bytes = entry.serializer.serialize(&snapshot).map_err(|e| {
            warn!(namespace = %entry.namespace, "failed to encode snapshot: {:?}", e);
            e
        })?;
        write_file_atomically(&entry.path, &bytes)?;
        debug!(
            namespace = %entry.namespace,
            bytes = bytes.len(),
            "snapshot dumped to {:?}",
            entry.path
        );
        Ok(())
    }

    /// Builds a store-independent copy of a namespace's map, for callers
    /// that need an owned view.
    pub fn configurations(
        &self,
        namespace: &str,
    ) -> HashMap<String, String> {
        self.snapshot(namespace)
            .map(|s| s.configurations.clone())
            .unwrap_or_default()
    }
}
