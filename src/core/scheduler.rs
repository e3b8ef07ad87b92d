//! Pacing of remote fetches.

use crate::error::{Result, WatchError};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Enforces a minimum interval between fetches while staying responsive to
/// cancellation.
///
/// The scheduler holds no clock state of its own: the caller passes the time
/// of its last fetch, or `None` if it has never fetched, in which case the
/// next poll may happen immediately.
#[derive(Debug, Clone, Copy)]
pub struct PollScheduler {
    min_interval: Duration,
}

impl PollScheduler {
    /// Create a scheduler with the given minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    /// The minimum interval between fetches.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Earliest instant the next fetch may start.
    pub fn next_poll_at(&self, last_fetch: Option<Instant>) -> Option<Instant> {
        last_fetch.map(|at| at + self.min_interval)
    }

    /// Time left until the next fetch may start, measured from `now`.
    pub fn remaining(&self, last_fetch: Option<Instant>, now: Instant) -> Duration {
        self.next_poll_at(last_fetch)
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Wait until the next fetch may start.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Cancelled`] as soon as `cancel` fires, including
    /// when it was already cancelled on entry.
    pub async fn wait(
        &self,
        last_fetch: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(WatchError::Cancelled);
        }

        let Some(deadline) = self.next_poll_at(last_fetch) else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WatchError::Cancelled),
            _ = sleep_until(deadline) => Ok(()),
        }
    }
}
