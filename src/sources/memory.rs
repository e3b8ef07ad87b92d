//! In-memory variable source.

use super::{Contents, FetchError, RemoteVariable, StatusCode, VariableSource};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type Response = Result<RemoteVariable, FetchError>;

#[derive(Default)]
struct MemoryState {
    variables: HashMap<String, RemoteVariable>,
    scripted: HashMap<String, VecDeque<Response>>,
    fetches: HashMap<String, usize>,
}

/// Variable source backed by process memory.
///
/// Useful for tests and local development. Clones share the same store, so a
/// handle can be kept to mutate variables after the source is handed to a
/// [`Client`](crate::core::Client).
///
/// Besides the current value of each variable, responses can be queued with
/// [`enqueue`](Self::enqueue); queued responses are served first, in order.
///
/// # Examples
///
/// ```rust
/// use runtimevar_watch::sources::MemorySource;
///
/// let source = MemorySource::new();
/// source.set("projects/p/configs/c/variables/v", r#"{"port": 8080}"#);
/// ```
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySource {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a variable, stamped with the current time.
    pub fn set(&self, name: impl Into<String>, contents: impl Into<Contents>) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.set_with_update_time(name, contents, Some(now));
    }

    /// Store a variable with an explicit (possibly malformed) update time.
    pub fn set_with_update_time(
        &self,
        name: impl Into<String>,
        contents: impl Into<Contents>,
        update_time: Option<String>,
    ) {
        let name = name.into();
        let variable = RemoteVariable {
            name: name.clone(),
            contents: contents.into(),
            update_time,
        };
        self.state.lock().variables.insert(name, variable);
    }

    /// Remove a variable. Subsequent fetches report "not found".
    pub fn delete(&self, name: &str) {
        self.state.lock().variables.remove(name);
    }

    /// Queue a response to be served ahead of the stored value.
    pub fn enqueue(&self, name: impl Into<String>, response: Result<RemoteVariable, FetchError>) {
        self.state
            .lock()
            .scripted
            .entry(name.into())
            .or_default()
            .push_back(response);
    }

    /// Number of fetches issued for a variable.
    pub fn fetch_count(&self, name: &str) -> usize {
        self.state.lock().fetches.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VariableSource for MemorySource {
    async fn get_variable(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteVariable, FetchError> {
        let mut state = self.state.lock();
        *state.fetches.entry(name.to_string()).or_default() += 1;

        if cancel.is_cancelled() {
            return Err(FetchError::status(StatusCode::Cancelled, "request cancelled"));
        }

        if let Some(response) = state.scripted.get_mut(name).and_then(VecDeque::pop_front) {
            return response;
        }

        state
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::not_found(format!("variable {name} does not exist")))
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
