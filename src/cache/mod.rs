//! In-memory namespace snapshots and their on-disk backups.
mod serializer;
mod snapshot;
mod store;

pub use serializer::*;
pub use snapshot::*;
pub use store::*;
