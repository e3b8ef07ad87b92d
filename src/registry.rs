//! Opening watchers from URLs.
//!
//! A [`UrlMux`] maps URL schemes to [`VariableUrlOpener`]s. There is no
//! process-wide registry: build a mux, register the openers you need, and
//! pass it to whatever code opens variables.
//!
//! ```rust
//! use runtimevar_watch::registry::{MEMORY_SCHEME, MemoryUrlOpener, UrlMux};
//! use runtimevar_watch::sources::MemorySource;
//!
//! # fn example() -> runtimevar_watch::error::Result<()> {
//! let source = MemorySource::new();
//! let mut mux = UrlMux::new();
//! mux.register(MEMORY_SCHEME, MemoryUrlOpener::new(source))?;
//!
//! let watcher = mux.open_variable::<serde_json::Value>(
//!     "mem://projects/p/configs/c/variables/v?wait_time=30s",
//! )?;
//! assert_eq!(watcher.wait_time().as_secs(), 30);
//! # Ok(())
//! # }
//! ```

use crate::core::{Client, ResourceName, WatchOptions, Watcher};
use crate::error::{Result, WatchError};
use crate::sources::MemorySource;
use chrono::TimeDelta;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Scheme served by [`MemoryUrlOpener`].
pub const MEMORY_SCHEME: &str = "mem";

/// Scheme served by [`RuntimeConfigUrlOpener`].
#[cfg(feature = "http")]
pub const RUNTIMECONFIG_SCHEME: &str = "runtimeconfigurator";

/// Resolves a URL to the client and variable it names.
///
/// Openers must not keep per-URL state; they may be called concurrently.
pub trait VariableUrlOpener: Send + Sync {
    /// Return the client serving `url` and the variable it names.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidUrl`] if the URL does not name a variable.
    fn open_variable_url(&self, url: &Url) -> Result<(Client, ResourceName)>;
}

/// URL scheme multiplexer.
#[derive(Default)]
pub struct UrlMux {
    schemes: HashMap<String, Arc<dyn VariableUrlOpener>>,
}

impl UrlMux {
    /// Create a mux with no registered schemes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mux serving `runtimeconfigurator://` URLs from the public
    /// Runtime Configurator endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    #[cfg(feature = "http")]
    pub fn with_defaults() -> Result<Self> {
        let mut mux = Self::new();
        mux.register(RUNTIMECONFIG_SCHEME, RuntimeConfigUrlOpener::connect()?)?;
        Ok(mux)
    }

    /// Register an opener for a scheme.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DuplicateScheme`] if the scheme is taken.
    pub fn register<O>(&mut self, scheme: impl Into<String>, opener: O) -> Result<()>
    where
        O: VariableUrlOpener + 'static,
    {
        let scheme = scheme.into();
        if self.schemes.contains_key(&scheme) {
            return Err(WatchError::DuplicateScheme(scheme));
        }
        debug!(%scheme, "registered url opener");
        self.schemes.insert(scheme, Arc::new(opener));
        Ok(())
    }

    /// Whether an opener is registered for `scheme`.
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.schemes.contains_key(scheme)
    }

    /// Registered schemes in sorted order.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<_> = self.schemes.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Open a watcher for the variable named by `url`, decoding JSON.
    ///
    /// The optional `wait_time` query parameter (`500ms`, `30s`, `5m`, `1h`)
    /// sets the minimum interval between fetches.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed, has no registered scheme,
    /// or carries an invalid wait time.
    pub fn open_variable<T>(&self, url: &str) -> Result<Watcher<T>>
    where
        T: DeserializeOwned + 'static,
    {
        self.open_variable_with(url, WatchOptions::new())
    }

    /// Open a watcher with explicit options.
    ///
    /// A `wait_time` in the URL applies only if `options` does not set one.
    ///
    /// # Errors
    ///
    /// Same as [`open_variable`](Self::open_variable).
    pub fn open_variable_with<T>(
        &self,
        url: &str,
        mut options: WatchOptions<T>,
    ) -> Result<Watcher<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let (client, name) = self.resolve(url, &mut options)?;
        client.new_variable(&name, options)
    }

    /// Open a watcher that decodes only with the decode function in
    /// `options`, so `T` needs no serde support.
    ///
    /// # Errors
    ///
    /// Same as [`open_variable`](Self::open_variable), plus
    /// [`WatchError::InvalidOption`] when no decode function is set.
    pub fn open_decoded_variable<T>(
        &self,
        url: &str,
        mut options: WatchOptions<T>,
    ) -> Result<Watcher<T>>
    where
        T: 'static,
    {
        let (client, name) = self.resolve(url, &mut options)?;
        client.new_decoded_variable(&name, options)
    }

    /// Dispatch `url` to its opener, folding URL query options into `options`.
    fn resolve<T>(
        &self,
        url: &str,
        options: &mut WatchOptions<T>,
    ) -> Result<(Client, ResourceName)> {
        let parsed = Url::parse(url).map_err(|e| WatchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let opener = self
            .schemes
            .get(parsed.scheme())
            .ok_or_else(|| WatchError::UnknownScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            })?;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "wait_time" if options.wait_time.is_none() => {
                    options.wait_time = Some(parse_wait_time(&value).ok_or_else(|| {
                        WatchError::InvalidUrl {
                            url: url.to_string(),
                            reason: format!("invalid wait_time {:?}", value),
                        }
                    })?);
                }
                "wait_time" => {}
                other => {
                    return Err(WatchError::InvalidUrl {
                        url: url.to_string(),
                        reason: format!("unknown query parameter {:?}", other),
                    });
                }
            }
        }

        opener.open_variable_url(&parsed)
    }
}

/// Resource name carried by `scheme://projects/p/configs/c/variables/v`.
fn resource_name_from_url(url: &Url) -> Result<ResourceName> {
    let path = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
    path.parse().map_err(|e: WatchError| WatchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Parse `500ms`, `30s`, `5m` or `1h`; a leading `-` is kept so that
/// negative values reach option validation.
fn parse_wait_time(raw: &str) -> Option<TimeDelta> {
    let (negative, raw) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let split = raw.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = raw.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    let amount = if negative { -amount } else { amount };

    match unit {
        "ms" => TimeDelta::try_milliseconds(amount),
        "s" => TimeDelta::try_seconds(amount),
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        _ => None,
    }
}

/// Opens `mem://` URLs against a shared [`MemorySource`].
pub struct MemoryUrlOpener {
    client: Client,
}

impl MemoryUrlOpener {
    /// Create an opener serving variables from `source`.
    pub fn new(source: MemorySource) -> Self {
        Self {
            client: Client::new(source),
        }
    }
}

impl VariableUrlOpener for MemoryUrlOpener {
    fn open_variable_url(&self, url: &Url) -> Result<(Client, ResourceName)> {
        Ok((self.client.clone(), resource_name_from_url(url)?))
    }
}

/// Opens `runtimeconfigurator://` URLs against a REST client.
#[cfg(feature = "http")]
pub struct RuntimeConfigUrlOpener {
    client: Client,
}

#[cfg(feature = "http")]
impl RuntimeConfigUrlOpener {
    /// Create an opener that serves every URL from `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create an opener for the public Runtime Configurator endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn connect() -> Result<Self> {
        Ok(Self::new(Client::connect()?))
    }
}

#[cfg(feature = "http")]
impl VariableUrlOpener for RuntimeConfigUrlOpener {
    fn open_variable_url(&self, url: &Url) -> Result<(Client, ResourceName)> {
        Ok((self.client.clone(), resource_name_from_url(url)?))
    }
}
