//! Built-in metrics for watchers.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Fetches issued against the backend
//! - Changes and deletions reported to callers
//! - Failed polls (fetch, timestamp and decode errors)
//! - Age of the last observed change
//!
//! # Examples
//!
//! ```rust,no_run
//! use opentelemetry::global;
//! use runtimevar_watch::metrics::WatchMetrics;
//! use runtimevar_watch::prelude::*;
//! use runtimevar_watch::sources::MemorySource;
//!
//! # fn example() -> Result<()> {
//! let metrics = WatchMetrics::new(global::meter("my-app"));
//!
//! let client = Client::new(MemorySource::new());
//! let watcher = client.new_variable::<serde_json::Value>(
//!     &ResourceName::new("p", "c", "flags"),
//!     WatchOptions::new().with_metrics(metrics),
//! )?;
//! # Ok(())
//! # }
//! ```

mod watch_metrics;

#[cfg(test)]
pub(crate) mod recording;

pub use watch_metrics::WatchMetrics;
