//! # runtimevar-watch
//!
//! Poll-based watching of remotely stored runtime configuration variables.
//!
//! ## Overview
//!
//! `runtimevar-watch` keeps a local view of a configuration variable that
//! lives in a backend without push notifications:
//! - A scheduler spaces fetches at least a configured wait time apart
//! - A change detector compares fetched bytes with the last observation and
//!   only reports real changes
//! - Deletions are reported once, as a `NotFound` error
//! - Decoding is pluggable, JSON by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runtimevar_watch::prelude::*;
//! use serde::Deserialize;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Deserialize)]
//! struct FeatureFlags {
//!     new_checkout: bool,
//! }
//!
//! # async fn example() -> runtimevar_watch::error::Result<()> {
//! let client = Client::connect()?;
//! let mut watcher = client.new_variable::<FeatureFlags>(
//!     &ResourceName::new("my-project", "app", "flags"),
//!     WatchOptions::new().with_wait_time(chrono::TimeDelta::seconds(30)),
//! )?;
//!
//! let cancel = CancellationToken::new();
//! loop {
//!     match watcher.watch(&cancel).await {
//!         Ok(snapshot) => println!("flags at {}: {:?}", snapshot.update_time, snapshot.value),
//!         Err(e) if e.is_not_found() => println!("flags deleted"),
//!         Err(e) if e.is_cancelled() => break,
//!         Err(e) => eprintln!("watch failed: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `http` (default): REST transport for the Runtime Configurator API
//! - `yaml`: YAML decoder
//! - `metrics`: OpenTelemetry metrics for watchers

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod registry;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        Client, DEFAULT_WAIT_TIME, Decode, ResourceName, Snapshot, WatchOptions, Watcher,
        bytes_decode, json_decode, string_decode,
    };
    pub use crate::error::{Result, WatchError};
}
