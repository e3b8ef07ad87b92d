//! Options accepted when creating a watcher.

use crate::core::decoder::Decode;
use crate::error::{Result, WatchError};
use chrono::TimeDelta;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// Wait time used when none is configured.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(10 * 60);

/// Optional configuration for a watcher.
///
/// # Examples
///
/// ```rust
/// use chrono::TimeDelta;
/// use runtimevar_watch::core::{WatchOptions, string_decode};
///
/// let options = WatchOptions::new()
///     .with_wait_time(TimeDelta::seconds(30))
///     .with_decoder(string_decode());
/// ```
pub struct WatchOptions<T> {
    /// Minimum time between two fetches.
    ///
    /// A watcher remembers when it last contacted the backend and waits at
    /// least this long before the next fetch. Smaller values detect changes
    /// sooner at the cost of more requests against the backend's quota.
    /// Unset or zero selects [`DEFAULT_WAIT_TIME`]; negative values are
    /// rejected.
    pub wait_time: Option<TimeDelta>,

    /// Function used to decode variable contents. Defaults to JSON.
    pub decode: Option<Decode<T>>,

    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<WatchMetrics>,
}

impl<T> WatchOptions<T> {
    /// Create options with every value unset.
    pub fn new() -> Self {
        Self {
            wait_time: None,
            decode: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the minimum time between fetches.
    pub fn with_wait_time(mut self, wait_time: TimeDelta) -> Self {
        self.wait_time = Some(wait_time);
        self
    }

    /// Set the decode function.
    pub fn with_decoder(mut self, decode: Decode<T>) -> Self {
        self.decode = Some(decode);
        self
    }

    /// Record fetch and change metrics for this watcher.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: WatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<T> Default for WatchOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the configured wait time into the interval the scheduler uses.
///
/// # Errors
///
/// Returns [`WatchError::InvalidOption`] for negative values.
pub(crate) fn resolve_wait_time(wait_time: Option<TimeDelta>) -> Result<Duration> {
    match wait_time {
        None => Ok(DEFAULT_WAIT_TIME),
        Some(delta) if delta.is_zero() => Ok(DEFAULT_WAIT_TIME),
        Some(delta) => delta.to_std().map_err(|_| {
            WatchError::InvalidOption(format!(
                "cannot have negative wait time option value: {}",
                delta
            ))
        }),
    }
}
