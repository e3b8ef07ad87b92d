//! In-process meter that keeps counter totals, for asserting on metrics in tests.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, InstrumentBuilder, InstrumentProvider, Meter, SyncInstrument};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Counter totals by instrument name.
#[derive(Clone, Default)]
pub(crate) struct Totals(Arc<Mutex<HashMap<String, u64>>>);

impl Totals {
    pub(crate) fn get(&self, name: &str) -> u64 {
        self.0.lock().get(name).copied().unwrap_or(0)
    }
}

struct RecordingCounter {
    name: String,
    totals: Totals,
}

impl SyncInstrument<u64> for RecordingCounter {
    fn measure(&self, measurement: u64, _attributes: &[KeyValue]) {
        *self.totals.0.lock().entry(self.name.clone()).or_default() += measurement;
    }
}

struct RecordingProvider {
    totals: Totals,
}

impl InstrumentProvider for RecordingProvider {
    fn u64_counter(&self, builder: InstrumentBuilder<'_, Counter<u64>>) -> Counter<u64> {
        Counter::new(Arc::new(RecordingCounter {
            name: builder.name.to_string(),
            totals: self.totals.clone(),
        }))
    }
}

/// A meter whose `u64` counters add into the returned totals. Other
/// instruments are no-ops.
pub(crate) fn meter() -> (Meter, Totals) {
    let totals = Totals::default();
    let provider = RecordingProvider {
        totals: totals.clone(),
    };
    (Meter::new(Arc::new(provider)), totals)
}
