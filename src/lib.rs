//! Client-side mirror of Apollo configuration namespaces.
//!
//! Keeps a local, persistent snapshot of every registered namespace current
//! through long-poll notifications, and reports typed change-sets.
//!
//! Logging goes through `tracing`; install a subscriber to collect it.
mod cache;
mod client;
mod config;
mod constants;
mod diff;
mod errors;
mod namespace;
mod network;
mod notification;
mod sync;
mod utils;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use constants::*;
pub use diff::*;
pub use errors::*;
pub use namespace::*;
pub use network::*;
pub use notification::*;
pub use sync::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
