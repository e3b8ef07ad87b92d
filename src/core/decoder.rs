//! Decoding raw variable contents into typed values.

use crate::error::{Result, WatchError};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Function that turns raw variable bytes into a typed value.
pub type Decode<T> = Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>;

/// Decodes raw variable contents into `T`.
///
/// Wraps a [`Decode`] function; the watcher only ever sees this type, so the
/// serialization format is chosen entirely by whoever builds the watcher.
pub struct Decoder<T> {
    decode: Decode<T>,
}

impl<T> Decoder<T> {
    /// Create a decoder from a decode function.
    pub fn new(decode: Decode<T>) -> Self {
        Self { decode }
    }

    /// Decode a byte payload.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Decode`] if the payload is malformed.
    pub fn decode(&self, bytes: &[u8]) -> Result<T> {
        (self.decode)(bytes)
    }
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

/// Decode JSON into `T`. This is the default decoder.
///
/// # Examples
///
/// ```rust
/// use runtimevar_watch::core::json_decode;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Flags {
///     beta: bool,
/// }
///
/// let decode = json_decode::<Flags>();
/// let flags = decode(br#"{"beta": true}"#).unwrap();
/// assert!(flags.beta);
/// ```
pub fn json_decode<T>() -> Decode<T>
where
    T: DeserializeOwned + 'static,
{
    Arc::new(|bytes: &[u8]| {
        serde_json::from_slice(bytes)
            .map_err(|e| WatchError::Decode(format!("Failed to parse JSON: {}", e)))
    })
}

/// Decode YAML into `T`.
#[cfg(feature = "yaml")]
pub fn yaml_decode<T>() -> Decode<T>
where
    T: DeserializeOwned + 'static,
{
    Arc::new(|bytes: &[u8]| {
        serde_yaml::from_slice(bytes)
            .map_err(|e| WatchError::Decode(format!("Failed to parse YAML: {}", e)))
    })
}

/// Decode the payload as UTF-8 text.
pub fn string_decode() -> Decode<String> {
    Arc::new(|bytes: &[u8]| {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| WatchError::Decode(format!("Invalid UTF-8: {}", e)))
    })
}

/// Pass the payload through unchanged.
pub fn bytes_decode() -> Decode<Vec<u8>> {
    Arc::new(|bytes: &[u8]| Ok(bytes.to_vec()))
}
