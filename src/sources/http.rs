//! Runtime Configurator REST source.

use super::{Contents, FetchError, RemoteVariable, StatusCode, VariableSource};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Public endpoint of the Runtime Configurator API.
pub const DEFAULT_ENDPOINT: &str = "https://runtimeconfig.googleapis.com";

const API_VERSION: &str = "v1beta1";

/// Variable source that reads from a Runtime Configurator compatible REST API.
///
/// Each fetch is a single `GET {endpoint}/v1beta1/{name}`. The request is
/// raced against the caller's cancellation token. Request credentials are
/// not managed here; point the source at an endpoint (or proxy) that does
/// not need them.
///
/// # Examples
///
/// ```rust,no_run
/// use runtimevar_watch::sources::RuntimeConfigSource;
/// use std::time::Duration;
///
/// # fn example() -> runtimevar_watch::error::Result<()> {
/// let source = RuntimeConfigSource::builder()
///     .with_endpoint("http://localhost:8085")
///     .with_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RuntimeConfigSource {
    endpoint: Url,
    client: Client,
}

impl RuntimeConfigSource {
    /// Create a new builder for constructing a REST source.
    pub fn builder() -> RuntimeConfigSourceBuilder {
        RuntimeConfigSourceBuilder::new()
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn variable_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            API_VERSION,
            name.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl VariableSource for RuntimeConfigSource {
    async fn get_variable(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<RemoteVariable, FetchError> {
        let request = self.client.get(self.variable_url(name)).send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::status(StatusCode::Cancelled, "request cancelled"));
            }
            response = request => response.map_err(classify_transport_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let code = StatusCode::from_http_status(status.as_u16());
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            });
            return Err(FetchError::status(code, message));
        }

        let body: VariableBody = response.json().await.map_err(|e| {
            FetchError::status(StatusCode::Unknown, format!("Failed to parse response: {}", e))
        })?;

        body.into_remote(name)
    }

    fn name(&self) -> String {
        format!("runtimeconfig:{}", self.endpoint)
    }
}

/// JSON representation of a variable returned by the REST API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariableBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

impl VariableBody {
    fn into_remote(self, requested: &str) -> std::result::Result<RemoteVariable, FetchError> {
        // The API sends `value` (base64) or `text`, never both.
        let contents = match (self.value, self.text) {
            (Some(encoded), _) => Contents::Value(BASE64.decode(encoded.as_bytes()).map_err(|e| {
                FetchError::status(StatusCode::Unknown, format!("Invalid base64 value: {}", e))
            })?),
            (None, Some(text)) => Contents::Text(text),
            (None, None) => Contents::Text(String::new()),
        };

        Ok(RemoteVariable {
            name: self.name.unwrap_or_else(|| requested.to_string()),
            contents,
            update_time: self.update_time,
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::status(StatusCode::DeadlineExceeded, err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Builder for constructing a `RuntimeConfigSource`.
pub struct RuntimeConfigSourceBuilder {
    endpoint: String,
    timeout: Duration,
}

impl RuntimeConfigSourceBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the API endpoint, e.g. a local emulator.
    ///
    /// Default is [`DEFAULT_ENDPOINT`].
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Default is 30 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the REST source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint is not an absolute http(s) URL
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> Result<RuntimeConfigSource> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| WatchError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(WatchError::InvalidUrl {
                url: self.endpoint,
                reason: "endpoint must use http or https".to_string(),
            });
        }

        let client = Client::builder().timeout(self.timeout).build().map_err(|e| {
            WatchError::InvalidOption(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(RuntimeConfigSource { endpoint, client })
    }
}

impl Default for RuntimeConfigSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
