//! Background polling into a lock-free latest-value cell.

use crate::core::{Snapshot, Watcher};
use crate::error::WatchError;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The most recent value of a variable, kept current by a background task.
///
/// Reads are lock-free (`arc-swap`). The background task owns the
/// [`Watcher`] and calls [`Watcher::watch`] in a loop: changes replace the
/// value, a deletion clears it, other errors are logged and polling
/// continues at the watcher's pace. The task ends when the cancellation
/// token fires, the client is closed, or every handle has been dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use runtimevar_watch::notify::LatestValue;
/// use runtimevar_watch::prelude::*;
/// use runtimevar_watch::sources::MemorySource;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<()> {
/// let client = Client::new(MemorySource::new());
/// let watcher = client.new_variable::<serde_json::Value>(
///     &ResourceName::new("p", "c", "flags"),
///     WatchOptions::new(),
/// )?;
///
/// let mut latest = LatestValue::spawn(watcher, CancellationToken::new());
/// while latest.changed().await {
///     println!("flags are now {:?}", latest.get().map(|s| s.value.clone()));
/// }
/// # Ok(())
/// # }
/// ```
pub struct LatestValue<T> {
    current: Arc<ArcSwapOption<Snapshot<T>>>,
    last_error: Arc<ArcSwapOption<String>>,
    updates: watch::Receiver<u64>,
    cancel: CancellationToken,
    task: Arc<JoinHandle<()>>,
}

impl<T> LatestValue<T>
where
    T: Send + Sync + 'static,
{
    /// Start polling `watcher` in a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(watcher: Watcher<T>, cancel: CancellationToken) -> Self {
        let current = Arc::new(ArcSwapOption::empty());
        let last_error = Arc::new(ArcSwapOption::empty());
        let (tx, updates) = watch::channel(0u64);

        let task = tokio::spawn(poll(
            watcher,
            Arc::clone(&current),
            Arc::clone(&last_error),
            tx,
            cancel.clone(),
        ));

        Self {
            current,
            last_error,
            updates,
            cancel,
            task: Arc::new(task),
        }
    }
}

impl<T> LatestValue<T> {
    /// The latest snapshot, or `None` before the first value or after a deletion.
    pub fn get(&self) -> Option<Arc<Snapshot<T>>> {
        self.current.load_full()
    }

    /// Number of updates (changes and deletions) observed so far.
    pub fn version(&self) -> u64 {
        *self.updates.borrow()
    }

    /// Message of the most recent polling error since the last update.
    pub fn last_error(&self) -> Option<Arc<String>> {
        self.last_error.load_full()
    }

    /// Wait for the next update.
    ///
    /// Returns `false` once the background task has stopped.
    pub async fn changed(&mut self) -> bool {
        self.updates.changed().await.is_ok()
    }

    /// Stop the background task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the background task is still polling.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            last_error: Arc::clone(&self.last_error),
            updates: self.updates.clone(),
            cancel: self.cancel.clone(),
            task: Arc::clone(&self.task),
        }
    }
}

async fn poll<T>(
    mut watcher: Watcher<T>,
    current: Arc<ArcSwapOption<Snapshot<T>>>,
    last_error: Arc<ArcSwapOption<String>>,
    updates: watch::Sender<u64>,
    cancel: CancellationToken,
) {
    loop {
        let outcome = tokio::select! {
            biased;
            _ = updates.closed() => {
                debug!(variable = %watcher.name(), "all handles dropped");
                break;
            }
            outcome = watcher.watch(&cancel) => outcome,
        };

        match outcome {
            Ok(snapshot) => {
                current.store(Some(Arc::new(snapshot)));
                last_error.store(None);
                updates.send_modify(|version| *version += 1);
            }
            Err(err) if err.is_not_found() => {
                current.store(None);
                last_error.store(None);
                updates.send_modify(|version| *version += 1);
            }
            Err(WatchError::Cancelled) | Err(WatchError::ClientClosed) => break,
            Err(err) => {
                warn!(variable = %watcher.name(), error = %err, "watch failed, polling continues");
                last_error.store(Some(Arc::new(err.to_string())));
            }
        }
    }

    debug!(variable = %watcher.name(), "background polling stopped");
}
