//! Client that owns the shared connection to a variable source.

use crate::core::decoder::{Decoder, json_decode};
use crate::core::options::{WatchOptions, resolve_wait_time};
use crate::core::resource::ResourceName;
use crate::core::scheduler::PollScheduler;
use crate::core::watcher::Watcher;
use crate::error::{Result, WatchError};
use crate::sources::VariableSource;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source handle shared by a client and every watcher derived from it.
#[derive(Clone)]
pub(crate) struct Connection {
    source: Arc<dyn VariableSource>,
    closed: CancellationToken,
}

impl Connection {
    pub(crate) fn source(&self) -> &dyn VariableSource {
        self.source.as_ref()
    }

    pub(crate) fn source_name(&self) -> String {
        self.source.name()
    }

    /// Resolves once the owning client has been closed.
    pub(crate) async fn closed(&self) {
        self.closed.cancelled().await
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Entry point for watching variables stored in one backend.
///
/// The underlying source is shared, read-only, by every watcher the client
/// creates. Closing the client invalidates all of them.
///
/// # Examples
///
/// ```rust
/// use runtimevar_watch::prelude::*;
/// use runtimevar_watch::sources::MemorySource;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Flags {
///     beta: bool,
/// }
///
/// # fn example() -> Result<()> {
/// let client = Client::new(MemorySource::new());
/// let watcher = client.new_variable::<Flags>(
///     &ResourceName::new("my-project", "app", "flags"),
///     WatchOptions::new(),
/// )?;
/// assert_eq!(watcher.wait_time(), DEFAULT_WAIT_TIME);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Create a client over a variable source.
    pub fn new<S: VariableSource + 'static>(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Create a client over an already shared source.
    pub fn from_shared(source: Arc<dyn VariableSource>) -> Self {
        Self {
            connection: Connection {
                source,
                closed: CancellationToken::new(),
            },
        }
    }

    /// Create a client for the public Runtime Configurator endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    #[cfg(feature = "http")]
    pub fn connect() -> Result<Self> {
        Ok(Self::new(crate::sources::RuntimeConfigSource::builder().build()?))
    }

    /// Create a watcher for one variable.
    ///
    /// Values are decoded into `T` with the configured decode function, or
    /// JSON when none is set. The first [`Watcher::watch`] call fetches
    /// immediately; later calls are paced by the wait time.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidOption`] for a negative wait time and
    /// [`WatchError::ClientClosed`] if the client was closed. No request is
    /// made in either case.
    pub fn new_variable<T>(
        &self,
        name: &ResourceName,
        mut options: WatchOptions<T>,
    ) -> Result<Watcher<T>>
    where
        T: DeserializeOwned + 'static,
    {
        options.decode.get_or_insert_with(json_decode::<T>);
        self.new_decoded_variable(name, options)
    }

    /// Create a watcher whose values are produced only by the decode
    /// function in `options`.
    ///
    /// Unlike [`new_variable`](Self::new_variable), `T` needs no serde
    /// support.
    ///
    /// # Errors
    ///
    /// Same as [`new_variable`](Self::new_variable), plus
    /// [`WatchError::InvalidOption`] when no decode function is set.
    pub fn new_decoded_variable<T>(
        &self,
        name: &ResourceName,
        options: WatchOptions<T>,
    ) -> Result<Watcher<T>>
    where
        T: 'static,
    {
        if self.connection.is_closed() {
            return Err(WatchError::ClientClosed);
        }

        let wait_time = resolve_wait_time(options.wait_time)?;
        let decode = options.decode.ok_or_else(|| {
            WatchError::InvalidOption(format!("no decode function set for {}", name))
        })?;

        debug!(
            variable = %name,
            source = %self.connection.source_name(),
            wait_time = ?wait_time,
            "creating watcher"
        );

        let watcher = Watcher::new(
            name.to_string(),
            self.connection.clone(),
            PollScheduler::new(wait_time),
            Decoder::new(decode),
        );

        #[cfg(feature = "metrics")]
        let watcher =
            watcher.with_metrics(options.metrics.map(|m| m.with_variable(name.to_string())));

        Ok(watcher)
    }

    /// Close the shared connection.
    ///
    /// Every watcher created from this client (or its clones) fails with
    /// [`WatchError::ClientClosed`] from then on, including ones currently
    /// waiting between polls.
    pub fn close(&self) {
        debug!(source = %self.connection.source_name(), "closing client");
        self.connection.closed.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> String {
        self.connection.source_name()
    }
}
