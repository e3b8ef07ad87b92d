//! Example demonstrating change detection against an in-memory backend.
//!
//! This example shows how to:
//! - Open a watcher through the URL registry
//! - Receive only real changes, even when the backend is polled repeatedly
//! - Observe a deletion once and a later re-creation
//!
//! Run with: cargo run --example memory_watch

use chrono::TimeDelta;
use runtimevar_watch::prelude::*;
use runtimevar_watch::registry::{MEMORY_SCHEME, MemoryUrlOpener, UrlMux};
use runtimevar_watch::sources::MemorySource;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const NAME: &str = "projects/demo/configs/app/variables/limits";

#[derive(Debug, Deserialize)]
struct Limits {
    max_connections: u32,
    burst: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== In-Memory Watch Example ===\n");

    let backend = MemorySource::new();
    backend.set(NAME, r#"{"max_connections": 100, "burst": 10}"#);

    let mut mux = UrlMux::new();
    mux.register(MEMORY_SCHEME, MemoryUrlOpener::new(backend.clone()))?;

    let mut watcher = mux.open_variable_with::<Limits>(
        "mem://projects/demo/configs/app/variables/limits",
        WatchOptions::new().with_wait_time(TimeDelta::milliseconds(200)),
    )?;
    println!("Watching {} every {:?}\n", watcher.name(), watcher.wait_time());

    let cancel = CancellationToken::new();
    let writer = {
        let backend = backend.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            println!("--- backend: same bytes rewritten ---");
            backend.set(NAME, r#"{"max_connections": 100, "burst": 10}"#);

            tokio::time::sleep(Duration::from_millis(500)).await;
            println!("--- backend: limits raised ---");
            backend.set(NAME, r#"{"max_connections": 250, "burst": 25}"#);

            tokio::time::sleep(Duration::from_millis(500)).await;
            println!("--- backend: variable deleted ---");
            backend.delete(NAME);

            tokio::time::sleep(Duration::from_millis(500)).await;
            println!("--- backend: variable re-created ---");
            backend.set(NAME, r#"{"max_connections": 50, "burst": 5}"#);

            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        })
    };

    loop {
        match watcher.watch(&cancel).await {
            Ok(snapshot) => println!(
                "limits updated at {}: max_connections={} burst={}",
                snapshot.update_time, snapshot.value.max_connections, snapshot.value.burst
            ),
            Err(e) if e.is_not_found() => println!("limits deleted: {}", e),
            Err(e) if e.is_cancelled() => break,
            Err(e) => println!("watch failed: {}", e),
        }
    }

    let _ = writer.await;
    println!(
        "\nDone after {} fetches, only real changes were reported.",
        backend.fetch_count(NAME)
    );
    watcher.close()
}
