//! Watcher metrics tracking using OpenTelemetry.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics collector for watcher operations.
///
/// One collector can be shared by many watchers; each watcher labels its
/// measurements with its variable name.
///
/// # Examples
///
/// ```rust,no_run
/// use opentelemetry::global;
/// use runtimevar_watch::metrics::WatchMetrics;
///
/// let metrics = WatchMetrics::new(global::meter("runtimevar-watch"));
/// metrics.record_fetch();
/// ```
#[derive(Clone)]
pub struct WatchMetrics {
    fetches: Counter<u64>,
    changes: Counter<u64>,
    deletions: Counter<u64>,
    errors: Counter<u64>,
    age_seconds: Gauge<i64>,
    attributes: Arc<[KeyValue]>,
    last_change: Arc<parking_lot::Mutex<Instant>>,
}

impl WatchMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let fetches = meter
            .u64_counter("runtimevar.fetches")
            .with_description("Number of fetches issued against the backend")
            .build();

        let changes = meter
            .u64_counter("runtimevar.changes")
            .with_description("Number of changes reported to callers")
            .build();

        let deletions = meter
            .u64_counter("runtimevar.deletions")
            .with_description("Number of deletions reported to callers")
            .build();

        let errors = meter
            .u64_counter("runtimevar.errors")
            .with_description("Number of failed polls")
            .build();

        let age_seconds = meter
            .i64_gauge("runtimevar.age")
            .with_description("Time since the last observed change in seconds")
            .with_unit("s")
            .build();

        Self {
            fetches,
            changes,
            deletions,
            errors,
            age_seconds,
            attributes: Arc::from(Vec::new()),
            last_change: Arc::new(parking_lot::Mutex::new(Instant::now())),
        }
    }

    /// Copy of this collector that labels measurements with `variable`.
    ///
    /// The copy tracks its own change age.
    pub fn with_variable(&self, variable: impl Into<String>) -> Self {
        Self {
            attributes: Arc::from(vec![KeyValue::new("variable", variable.into())]),
            last_change: Arc::new(parking_lot::Mutex::new(Instant::now())),
            ..self.clone()
        }
    }

    /// Record a fetch issued against the backend.
    pub fn record_fetch(&self) {
        self.fetches.add(1, &self.attributes);
    }

    /// Record a change reported to the caller.
    pub fn record_change(&self) {
        self.changes.add(1, &self.attributes);
        *self.last_change.lock() = Instant::now();
    }

    /// Record a deletion reported to the caller.
    pub fn record_deletion(&self) {
        self.deletions.add(1, &self.attributes);
        *self.last_change.lock() = Instant::now();
    }

    /// Record a failed poll.
    pub fn record_error(&self) {
        self.errors.add(1, &self.attributes);
    }

    /// Update the change age gauge.
    ///
    /// Watchers refresh it after every fetch.
    pub fn update_age(&self) {
        let age_secs = age_seconds(self.last_change.lock().elapsed());
        self.age_seconds.record(age_secs, &self.attributes);
    }
}

/// Whole seconds in `age`, saturating at `i64::MAX`.
fn age_seconds(age: Duration) -> i64 {
    i64::try_from(age.as_secs()).unwrap_or(i64::MAX)
}
