//! Performance benchmarks for runtimevar-watch.
//!
//! These cover the hot paths of a poll cycle against an in-memory source:
//! - Change detection and decoding for payloads of increasing size
//! - Lock-free reads of the latest value

use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use runtimevar_watch::notify::LatestValue;
use runtimevar_watch::prelude::*;
use runtimevar_watch::sources::MemorySource;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const NAME: &str = "projects/bench/configs/app/variables/settings";

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct BenchSettings {
    value: i32,
    name: String,
    flag: bool,
    items: Vec<String>,
}

fn payload(items: usize, generation: u64) -> String {
    let items: Vec<String> = (0..items).map(|i| format!("\"item-{}\"", i)).collect();
    format!(
        r#"{{"value": {}, "name": "benchmark", "flag": true, "items": [{}]}}"#,
        generation,
        items.join(",")
    )
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn watcher(source: &MemorySource) -> Watcher<BenchSettings> {
    Client::new(source.clone())
        .new_variable(
            &ResourceName::new("bench", "app", "settings"),
            WatchOptions::new().with_wait_time(TimeDelta::nanoseconds(1)),
        )
        .unwrap()
}

/// Benchmark a full poll cycle that observes a change
fn benchmark_detect_change(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("detect_change");

    for items in [1usize, 100, 10_000] {
        let source = MemorySource::new();
        let mut watcher = watcher(&source);
        let cancel = CancellationToken::new();
        let payloads = [payload(items, 1), payload(items, 2)];
        let mut generation = 0usize;

        group.throughput(Throughput::Bytes(payloads[0].len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                generation += 1;
                source.set(NAME, payloads[generation % 2].as_str());
                let snapshot = rt.block_on(watcher.watch(&cancel)).unwrap();
                black_box(snapshot.value.value);
            });
        });
    }
    group.finish();
}

/// Benchmark reads from the background-updated cell
fn benchmark_latest_read(c: &mut Criterion) {
    let rt = runtime();
    let source = MemorySource::new();
    source.set(NAME, payload(3, 1));

    let latest = rt.block_on(async {
        let mut latest = LatestValue::spawn(watcher(&source), CancellationToken::new());
        latest.changed().await;
        latest
    });

    let mut group = c.benchmark_group("latest_value");
    group.bench_function("get", |b| {
        b.iter(|| {
            let snapshot = latest.get();
            black_box(snapshot.map(|s| s.value.value));
        });
    });
    group.finish();

    latest.stop();
}

criterion_group!(benches, benchmark_detect_change, benchmark_latest_read);
criterion_main!(benches);
