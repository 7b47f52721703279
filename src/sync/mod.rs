//! Per-namespace synchronization.
//!
//! One [`NamespaceWatcher`] per registered namespace owns a single reaction
//! loop. Signals from the notification poller and periodic refresh ticks are
//! handled by that loop only, so fetch-and-reconcile never overlaps for a
//! namespace.
mod events;
mod fetcher;
mod watcher;

pub use events::*;
pub use fetcher::*;
pub use watcher::*;
