//! Change detection for a single polled variable.

use crate::core::client::Connection;
use crate::core::decoder::Decoder;
use crate::core::scheduler::PollScheduler;
use crate::error::{Result, WatchError};
use crate::sources::{RemoteVariable, StatusCode};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// A decoded variable value together with the time it was last updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// The decoded value
    pub value: T,
    /// Update time reported by the backend
    pub update_time: DateTime<Utc>,
}

/// What the watcher last observed. Private to one watcher.
#[derive(Debug, Default)]
struct WatchState {
    last_content: Option<Vec<u8>>,
    last_update_time: Option<DateTime<Utc>>,
    is_deleted: bool,
    last_fetch: Option<Instant>,
}

/// Polls one variable and reports each distinct change.
///
/// Created by [`Client::new_variable`](crate::core::Client::new_variable).
/// [`watch`](Self::watch) takes `&mut self`, so a watcher has exactly one
/// caller at a time; run one loop per watcher. Separate watchers are fully
/// independent.
///
/// # Examples
///
/// ```rust
/// use runtimevar_watch::prelude::*;
/// use runtimevar_watch::sources::MemorySource;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<()> {
/// let source = MemorySource::new();
/// let name = ResourceName::new("p", "c", "greeting");
/// source.set(name.to_string(), "hello");
///
/// let client = Client::new(source);
/// let mut watcher = client.new_variable(&name, WatchOptions::new().with_decoder(string_decode()))?;
///
/// let snapshot = watcher.watch(&CancellationToken::new()).await?;
/// assert_eq!(snapshot.value, "hello");
/// # Ok(())
/// # }
/// ```
pub struct Watcher<T> {
    name: String,
    connection: Connection,
    scheduler: PollScheduler,
    decoder: Decoder<T>,
    state: WatchState,
    #[cfg(feature = "metrics")]
    metrics: Option<WatchMetrics>,
}

impl<T> Watcher<T> {
    pub(crate) fn new(
        name: String,
        connection: Connection,
        scheduler: PollScheduler,
        decoder: Decoder<T>,
    ) -> Self {
        Self {
            name,
            connection,
            scheduler,
            decoder,
            state: WatchState::default(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<WatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Full resource name of the watched variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum time between two fetches.
    pub fn wait_time(&self) -> Duration {
        self.scheduler.min_interval()
    }

    /// Time of the last observed change or deletion.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.state.last_update_time
    }

    /// Whether the variable was absent on the last observation.
    pub fn is_deleted(&self) -> bool {
        self.state.is_deleted
    }

    /// Block until the variable changes, is deleted, or an error occurs.
    ///
    /// Fetches are spaced at least [`wait_time`](Self::wait_time) apart; the
    /// first call fetches immediately. Unchanged content and repeated "not
    /// found" responses are absorbed, so every `Ok` carries new content.
    ///
    /// # Errors
    ///
    /// - [`WatchError::Cancelled`] if `cancel` fires while waiting
    /// - [`WatchError::NotFound`] once when the variable disappears
    /// - [`WatchError::ClientClosed`] if the owning client was closed
    /// - [`WatchError::InvalidTimestamp`] or [`WatchError::Decode`] for
    ///   malformed data; the cached state is left as it was
    /// - [`WatchError::Fetch`] for any other backend failure
    ///
    /// None of these are fatal for the watcher; calling `watch` again
    /// resumes polling.
    pub async fn watch(&mut self, cancel: &CancellationToken) -> Result<Snapshot<T>> {
        loop {
            tokio::select! {
                biased;
                _ = self.connection.closed() => return Err(WatchError::ClientClosed),
                waited = self.scheduler.wait(self.state.last_fetch, cancel) => waited?,
            }

            debug!(
                variable = %self.name,
                source = %self.connection.source_name(),
                "fetching variable"
            );
            let fetched = self.connection.source().get_variable(&self.name, cancel).await;
            self.state.last_fetch = Some(Instant::now());
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.record_fetch();
                metrics.update_age();
            }

            match fetched {
                Ok(remote) => match self.observe(remote) {
                    Ok(Some(snapshot)) => return Ok(snapshot),
                    Ok(None) => debug!(variable = %self.name, "content unchanged"),
                    Err(err) => {
                        self.record_error();
                        return Err(err);
                    }
                },
                Err(err) if err.is_not_found() => {
                    if !self.state.is_deleted {
                        self.state.is_deleted = true;
                        self.state.last_update_time = Some(Utc::now());
                        info!(variable = %self.name, "variable deleted");
                        #[cfg(feature = "metrics")]
                        if let Some(metrics) = &self.metrics {
                            metrics.record_deletion();
                        }
                        return Err(WatchError::NotFound {
                            name: self.name.clone(),
                            message: err.message().to_string(),
                        });
                    }
                    debug!(variable = %self.name, "variable still absent");
                }
                Err(err) if err.code() == Some(StatusCode::Cancelled) && cancel.is_cancelled() => {
                    return Err(WatchError::Cancelled);
                }
                Err(err) => {
                    self.record_error();
                    return Err(WatchError::Fetch(err));
                }
            }
        }
    }

    /// Release the watcher. The shared client connection stays open.
    pub fn close(self) -> Result<()> {
        debug!(variable = %self.name, "watcher closed");
        Ok(())
    }

    /// Compare a fetched variable against the cached state.
    ///
    /// Returns the new snapshot if it is a change; leaves the state untouched
    /// on error.
    fn observe(&mut self, remote: RemoteVariable) -> Result<Option<Snapshot<T>>> {
        let update_time = parse_update_time(&remote)?;
        let bytes = remote.contents.into_bytes();

        if !self.state.is_deleted && !content_changed(self.state.last_content.as_deref(), &bytes) {
            return Ok(None);
        }

        let value = self.decoder.decode(&bytes)?;

        self.state.last_content = Some(bytes);
        self.state.last_update_time = Some(update_time);
        self.state.is_deleted = false;
        info!(variable = %self.name, %update_time, "variable changed");
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_change();
        }

        Ok(Some(Snapshot { value, update_time }))
    }

    fn record_error(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_error();
        }
    }
}

impl<T> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("name", &self.name)
            .field("wait_time", &self.scheduler.min_interval())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Whether `current` differs from the previously observed content.
///
/// Plain equality: unequal lengths or the first differing byte decide. Not a
/// constant-time comparison.
fn content_changed(previous: Option<&[u8]>, current: &[u8]) -> bool {
    match previous {
        None => true,
        Some(previous) => previous != current,
    }
}

fn parse_update_time(remote: &RemoteVariable) -> Result<DateTime<Utc>> {
    let raw = remote
        .update_time
        .as_deref()
        .ok_or_else(|| WatchError::InvalidTimestamp {
            name: remote.name.clone(),
            reason: "missing update time".to_string(),
        })?;

    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| WatchError::InvalidTimestamp {
            name: remote.name.clone(),
            reason: format!("{:?}: {}", raw, e),
        })
}
