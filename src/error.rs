//! Error types for runtimevar-watch.

use crate::sources::FetchError;

/// Result type alias for runtimevar-watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while constructing or polling a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// An option value was rejected when the watcher was constructed.
    #[error("Invalid watch option: {0}")]
    InvalidOption(String),

    /// The caller cancelled the operation.
    #[error("Watch cancelled")]
    Cancelled,

    /// The variable was observed to be absent.
    ///
    /// Returned exactly once per deletion; repeated absent observations
    /// after that are absorbed by the polling loop.
    #[error("Variable {name} not found: {message}")]
    NotFound {
        /// Full resource name of the variable
        name: String,
        /// Message reported by the backend
        message: String,
    },

    /// The remote fetch failed for a reason other than "not found".
    #[error("Failed to fetch variable: {0}")]
    Fetch(#[from] FetchError),

    /// The backend returned a variable with a missing or malformed update time.
    #[error("Variable {name} contains invalid timestamp: {reason}")]
    InvalidTimestamp {
        /// Full resource name of the variable
        name: String,
        /// Why the timestamp could not be parsed
        reason: String,
    },

    /// The variable contents could not be decoded into the target type.
    #[error("Failed to decode variable: {0}")]
    Decode(String),

    /// The client the watcher was created from has been closed.
    #[error("Client connection is closed")]
    ClientClosed,

    /// A URL could not be parsed or lacks the parts an opener needs.
    #[error("Invalid variable URL {url:?}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// What was wrong with it
        reason: String,
    },

    /// An opener is already registered for the scheme.
    #[error("Scheme {0:?} already registered")]
    DuplicateScheme(String),

    /// No opener is registered for the URL's scheme.
    #[error("No opener registered for scheme {scheme:?} (url {url:?})")]
    UnknownScheme {
        /// The URL being opened
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// Watch settings could not be loaded.
    #[error("Failed to load watch settings: {0}")]
    Settings(String),
}

impl WatchError {
    /// Whether this error reports a deletion of the watched variable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is the result of caller cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
