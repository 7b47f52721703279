//! Client facade of the configuration mirror
//!
//! - [`Client`] - reads, subscriptions and namespace lifecycle
//! - [`ClientBuilder`] - configurable client construction
//!
//! # Basic Usage
//! ```no_run
//! use apollo_mirror::Client;
//! use apollo_mirror::MirrorConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = Client::builder(MirrorConfig::default())
//!         .server_address("http://127.0.0.1:8080")
//!         .app_id("sample-app")
//!         .namespaces(vec!["application".into(), "redis.json".into()])
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     client.start().unwrap();
//!
//!     let timeout = client.get("timeout");
//!     let redis = client.get_content("redis.json");
//!     println!("timeout={:?} redis={:?}", timeout, redis);
//!
//!     let events = client.subscribe();
//!     if let Some(event) = events.recv().await {
//!         println!("{}", event);
//!     }
//!
//!     client.close().await.unwrap();
//! }
//! ```

mod builder;
mod client;

pub use builder::*;
pub use client::*;
