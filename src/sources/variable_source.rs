//! Variable source trait and the wire model it returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Trait for backends that store runtime configuration variables.
///
/// Implement this trait to poll a custom store. A source is shared between
/// every watcher created from the same [`Client`](crate::core::Client), so
/// implementations must be safe to call concurrently.
#[async_trait]
pub trait VariableSource: Send + Sync {
    /// Fetch the current state of a single variable.
    ///
    /// The token is the caller's cancellation signal. Sources that can abort
    /// an in-flight request should do so and report [`StatusCode::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`StatusCode::NotFound`] when the variable does not exist and
    /// any other classified or unclassified failure otherwise.
    async fn get_variable(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteVariable, FetchError>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}

/// A variable as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVariable {
    /// Full resource name
    pub name: String,
    /// The stored payload
    pub contents: Contents,
    /// Last update time in RFC 3339 form, as reported by the backend
    pub update_time: Option<String>,
}

/// Variable payload, stored either as binary or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contents {
    /// Binary payload
    Value(Vec<u8>),
    /// Text payload
    Text(String),
}

impl Contents {
    /// View the payload as raw bytes regardless of how it was stored.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Value(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Convert the payload into raw bytes regardless of how it was stored.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Value(bytes) => bytes,
            Self::Text(text) => text.into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Value(bytes)
    }
}

impl From<String> for Contents {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Canonical status codes reported by a variable backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The operation was cancelled by the caller
    Cancelled,
    /// Unknown error
    Unknown,
    /// The request was malformed
    InvalidArgument,
    /// The deadline expired before the operation completed
    DeadlineExceeded,
    /// The variable does not exist
    NotFound,
    /// The caller is not allowed to read the variable
    PermissionDenied,
    /// Quota or rate limit exhausted
    ResourceExhausted,
    /// The system is not in a state required for the operation
    FailedPrecondition,
    /// Operation not implemented by the backend
    Unimplemented,
    /// Internal backend error
    Internal,
    /// The backend is temporarily unavailable
    Unavailable,
    /// The request lacks valid credentials
    Unauthenticated,
}

impl StatusCode {
    /// Map an HTTP response status onto a canonical code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 | 412 => Self::FailedPrecondition,
            429 => Self::ResourceExhausted,
            499 => Self::Cancelled,
            501 => Self::Unimplemented,
            503 => Self::Unavailable,
            504 => Self::DeadlineExceeded,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
            Self::InvalidArgument => "InvalidArgument",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::NotFound => "NotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::Unimplemented => "Unimplemented",
            Self::Internal => "Internal",
            Self::Unavailable => "Unavailable",
            Self::Unauthenticated => "Unauthenticated",
        };
        f.write_str(name)
    }
}

/// Errors returned by a [`VariableSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The backend answered with a classified failure.
    #[error("{code}: {message}")]
    Status {
        /// Canonical status code
        code: StatusCode,
        /// Backend supplied message
        message: String,
    },

    /// The request failed in a way that could not be classified.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl FetchError {
    /// Create a classified error.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Create a "not found" error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NotFound, message)
    }

    /// The classified status code, if the failure could be classified.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Transport(_) => None,
        }
    }

    /// Whether the backend reported the variable as absent.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(StatusCode::NotFound)
    }

    /// The message attached to this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } | Self::Transport(message) => message,
        }
    }
}
