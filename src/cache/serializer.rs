//! Byte-level encodings of a [`Snapshot`] backup file.
//!
//! A namespace picks one serializer at registration and keeps it; the file
//! always holds the complete snapshot.

use std::fmt::Debug;
use std::sync::Arc;

use super::Snapshot;
use crate::Result;
use crate::SerializerKind;

/// Encoding strategy for on-disk snapshots
pub trait Serializer: Send + Sync + Debug {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    fn serialize(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Vec<u8>>;

    fn deserialize(
        &self,
        bytes: &[u8],
    ) -> Result<Snapshot>;
}

/// Structured-text encoding, the default
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(snapshot)?)
    }

    fn deserialize(
        &self,
        bytes: &[u8],
    ) -> Result<Snapshot> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compact binary encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn serialize(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Vec<u8>> {
        Ok(bincode::serialize(snapshot)?)
    }

    fn deserialize(
        &self,
        bytes: &[u8],
    ) -> Result<Snapshot> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl SerializerKind {
    pub fn serializer(self) -> Arc<dyn Serializer> {
        match self {
            SerializerKind::Json => Arc::new(JsonSerializer),
            SerializerKind::Bincode => Arc::new(BincodeSerializer),
        }
    }
}
