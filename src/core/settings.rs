//! Declarative watch settings loaded from files and the environment.

use crate::core::options::WatchOptions;
use crate::core::resource::ResourceName;
use crate::error::{Result, WatchError};
use chrono::TimeDelta;
use config::{Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Settings describing which variable to watch and how often.
///
/// Loaded with [`WatchSettings::load`] from an optional file (YAML, TOML or
/// JSON, detected by extension) overlaid by environment variables:
///
/// | Key | Environment variable |
/// |---|---|
/// | `project` | `{PREFIX}_PROJECT` |
/// | `config` | `{PREFIX}_CONFIG` |
/// | `variable` | `{PREFIX}_VARIABLE` |
/// | `wait_time_ms` | `{PREFIX}_WAIT_TIME_MS` |
/// | `endpoint` | `{PREFIX}_ENDPOINT` |
///
/// # Examples
///
/// ```rust,no_run
/// use runtimevar_watch::core::WatchSettings;
///
/// # fn example() -> runtimevar_watch::error::Result<()> {
/// let settings = WatchSettings::load(Some("config/watch.yaml"), "RUNTIMEVAR")?;
/// println!("watching {}", settings.resource_name());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchSettings {
    /// Project that owns the configuration
    pub project: String,
    /// Configuration resource name
    pub config: String,
    /// Variable name
    pub variable: String,
    /// Minimum time between fetches in milliseconds; unset or zero uses the default
    #[serde(default)]
    pub wait_time_ms: Option<i64>,
    /// Backend endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl WatchSettings {
    /// Load settings from an optional file and prefixed environment variables.
    ///
    /// Environment variables take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Settings`] if the file cannot be read or a
    /// required key is missing.
    pub fn load(path: Option<impl AsRef<Path>>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.as_ref()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| WatchError::Settings(format!("Failed to load settings: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| WatchError::Settings(format!("Failed to parse settings: {}", e)))
    }

    /// The resource name of the configured variable.
    pub fn resource_name(&self) -> ResourceName {
        ResourceName::new(&self.project, &self.config, &self.variable)
    }

    /// Watch options carrying the configured wait time.
    ///
    /// A negative wait time is passed through and rejected when the watcher
    /// is created.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidOption`] if `wait_time_ms` does not fit
    /// in a [`TimeDelta`].
    pub fn watch_options<T>(&self) -> Result<WatchOptions<T>> {
        let options = WatchOptions::new();
        let Some(ms) = self.wait_time_ms else {
            return Ok(options);
        };

        let wait_time = TimeDelta::try_milliseconds(ms).ok_or_else(|| {
            WatchError::InvalidOption(format!("wait time of {}ms is out of range", ms))
        })?;
        Ok(options.with_wait_time(wait_time))
    }

    /// A REST client for the configured endpoint, or the public one.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid http(s) URL.
    #[cfg(feature = "http")]
    pub fn client(&self) -> Result<crate::core::Client> {
        let mut builder = crate::sources::RuntimeConfigSource::builder();
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        Ok(crate::core::Client::new(builder.build()?))
    }
}
