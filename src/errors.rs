//! Configuration Mirror Error Hierarchy
//!
//! Defines the error types for the synchronization engine, categorized by
//! layer: transport, storage, serialization and namespace lifecycle.
//!
//! Only [`SyncError::Initialization`] is meant to reach the registering
//! caller. Every other error is recovered locally by the background loops.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Namespace lifecycle and client facade failures
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Network layer
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    // Serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    // Background poller and watcher tasks
    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The server answered 304: nothing changed since the supplied token.
    /// This is a valid outcome, not a failure.
    #[error("Configuration not modified: {url}")]
    NotModified { url: String },

    /// Any status other than 200 and 304
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Request did not complete in time
    #[error("Request to {url} timed out after {duration:?}")]
    Timeout { url: String, duration: Duration },

    /// Connection, DNS or body read failures
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed server address or path segment
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No cache file at the given location
    #[error("Cache file not found: {0}")]
    NotFound(PathBuf),

    /// Disk I/O failures during cache load or dump
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// I/O failure bound to a specific path
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// Decode failures for both server payloads and on-disk snapshots
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Namespace could be seeded neither from the server nor from disk
    #[error("Namespace {namespace} failed to initialize: {reason}")]
    Initialization { namespace: String, reason: String },

    #[error("Client is already running")]
    AlreadyRunning,

    #[error("Client is closed")]
    Closed,

    #[error("Namespace {0} is not registered")]
    UnknownNamespace(String),

    #[error("Namespace {0} is already registered")]
    DuplicateNamespace(String),
}

impl Error {
    /// True for the 304 "nothing changed" outcome.
    pub fn is_not_modified(&self) -> bool {
        matches!(
            self,
            Error::System(SystemError::Network(NetworkError::NotModified { .. }))
        )
    }

    /// Transport-level failures that the polling loops retry after a fixed delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::System(SystemError::Network(
                NetworkError::UnexpectedStatus { .. }
                    | NetworkError::Timeout { .. }
                    | NetworkError::Transport(_)
            ))
        )
    }

    /// Malformed server or disk payload.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::System(SystemError::Serialization(_)))
    }
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        SerializationError::Json(e).into()
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        SerializationError::Bincode(e).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e).into()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        NetworkError::Transport(e).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        SystemError::Task(err).into()
    }
}
