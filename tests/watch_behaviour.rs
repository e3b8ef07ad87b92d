//! End-to-end watcher behaviour against an in-memory backend.

use chrono::{DateTime, TimeDelta, Utc};
use runtimevar_watch::prelude::*;
use runtimevar_watch::sources::{Contents, FetchError, MemorySource, RemoteVariable, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(60);
const T0: &str = "2024-03-01T10:00:00Z";
const T1: &str = "2024-03-01T10:01:00Z";
const T2: &str = "2024-03-01T10:02:00Z";

fn resource() -> ResourceName {
    ResourceName::new("test-project", "app", "greeting")
}

fn name() -> String {
    resource().to_string()
}

fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn variable(contents: impl Into<Contents>, update_time: &str) -> RemoteVariable {
    RemoteVariable {
        name: name(),
        contents: contents.into(),
        update_time: Some(update_time.to_string()),
    }
}

fn string_watcher(source: &MemorySource) -> Watcher<String> {
    Client::new(source.clone())
        .new_variable(
            &resource(),
            WatchOptions::new()
                .with_wait_time(TimeDelta::from_std(WAIT).unwrap())
                .with_decoder(string_decode()),
        )
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_content_is_absorbed() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable("v1", T0)));
    source.enqueue(name(), Ok(variable("v1", T1)));
    source.enqueue(name(), Ok(variable("v2", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    let first = watcher.watch(&cancel).await.unwrap();
    assert_eq!(first.value, "v1");
    assert_eq!(first.update_time, at(T0));

    let start = Instant::now();
    let second = watcher.watch(&cancel).await.unwrap();
    assert_eq!(second.value, "v2");
    assert_eq!(second.update_time, at(T2));

    // The unchanged fetch in between costs one extra interval.
    assert_eq!(Instant::now() - start, WAIT * 2);
    assert_eq!(source.fetch_count(&name()), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_spurious_notifications() {
    let source = MemorySource::new();
    source.set(name(), "stable");
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    watcher.watch(&cancel).await.unwrap();

    let result = timeout(WAIT * 10, watcher.watch(&cancel)).await;
    assert!(result.is_err(), "unchanged content must not be reported");
    assert!(source.fetch_count(&name()) >= 10);
}

#[tokio::test(start_paused = true)]
async fn test_text_and_binary_payloads_compare_equal() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable("same", T0)));
    source.enqueue(name(), Ok(variable(b"same".to_vec(), T1)));
    source.enqueue(name(), Ok(variable("different", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    assert_eq!(watcher.watch(&cancel).await.unwrap().value, "same");
    assert_eq!(watcher.watch(&cancel).await.unwrap().value, "different");
    assert_eq!(source.fetch_count(&name()), 3);
}

#[tokio::test(start_paused = true)]
async fn test_deletion_reported_once() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable("v1", T0)));
    source.enqueue(name(), Err(FetchError::not_found("deleted")));
    source.enqueue(name(), Err(FetchError::not_found("deleted")));
    source.enqueue(name(), Err(FetchError::not_found("deleted")));
    source.enqueue(name(), Ok(variable("v2", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    assert_eq!(watcher.watch(&cancel).await.unwrap().value, "v1");

    let before = Utc::now();
    let err = watcher.watch(&cancel).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(watcher.is_deleted());
    assert!(watcher.last_update_time().unwrap() >= before);

    // The two further "not found" responses are absorbed.
    let snapshot = watcher.watch(&cancel).await.unwrap();
    assert_eq!(snapshot.value, "v2");
    assert!(!watcher.is_deleted());
    assert_eq!(source.fetch_count(&name()), 5);
}

#[tokio::test(start_paused = true)]
async fn test_first_observation_not_found() {
    let source = MemorySource::new();
    source.enqueue(name(), Err(FetchError::not_found("missing")));
    source.enqueue(name(), Err(FetchError::not_found("missing")));
    source.enqueue(name(), Ok(variable("v1", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    let err = watcher.watch(&cancel).await.unwrap_err();
    assert!(matches!(err, WatchError::NotFound { name: ref variable, .. } if *variable == name()));

    let snapshot = watcher.watch(&cancel).await.unwrap();
    assert_eq!(snapshot.value, "v1");
    assert_eq!(snapshot.update_time, at(T2));
    assert_eq!(source.fetch_count(&name()), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reappearance_with_identical_content_is_reported() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable("v1", T0)));
    source.enqueue(name(), Err(FetchError::not_found("deleted")));
    source.enqueue(name(), Ok(variable("v1", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    assert_eq!(watcher.watch(&cancel).await.unwrap().value, "v1");
    assert!(watcher.watch(&cancel).await.unwrap_err().is_not_found());

    let snapshot = watcher.watch(&cancel).await.unwrap();
    assert_eq!(snapshot.value, "v1");
    assert_eq!(snapshot.update_time, at(T2));
}

#[tokio::test(start_paused = true)]
async fn test_negative_wait_time_never_fetches() {
    let source = MemorySource::new();
    source.set(name(), "v1");

    let result = Client::new(source.clone()).new_variable::<String>(
        &resource(),
        WatchOptions::new().with_wait_time(TimeDelta::milliseconds(-1)),
    );

    assert!(matches!(result, Err(WatchError::InvalidOption(_))));
    assert_eq!(source.fetch_count(&name()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_default_wait_time_and_immediate_first_poll() {
    let source = MemorySource::new();
    source.set(name(), "v1");
    let mut watcher = Client::new(source.clone())
        .new_variable(
            &resource(),
            WatchOptions::new()
                .with_wait_time(TimeDelta::zero())
                .with_decoder(string_decode()),
        )
        .unwrap();
    assert_eq!(watcher.wait_time(), Duration::from_secs(600));

    let start = Instant::now();
    watcher.watch(&CancellationToken::new()).await.unwrap();
    assert_eq!(Instant::now(), start);

    source.set(name(), "v2");
    watcher.watch(&CancellationToken::new()).await.unwrap();
    assert_eq!(Instant::now() - start, DEFAULT_WAIT_TIME);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_sleeping() {
    let source = MemorySource::new();
    source.set(name(), "v1");
    let mut watcher = string_watcher(&source);

    watcher.watch(&CancellationToken::new()).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = watcher.watch(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(Instant::now() - start, Duration::from_secs(5));
    assert_eq!(source.fetch_count(&name()), 1);

    // The watcher is still usable with a fresh token.
    source.set(name(), "v2");
    let snapshot = watcher.watch(&CancellationToken::new()).await.unwrap();
    assert_eq!(snapshot.value, "v2");
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token_skips_fetch() {
    let source = MemorySource::new();
    source.set(name(), "v1");
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(watcher.watch(&cancel).await.unwrap_err().is_cancelled());
    assert_eq!(source.fetch_count(&name()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_timestamp_leaves_state() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable("v1", T0)));
    source.enqueue(name(), Ok(variable("v2", "not-a-time")));
    source.enqueue(name(), Ok(variable("v2", T2)));
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    watcher.watch(&cancel).await.unwrap();

    let err = watcher.watch(&cancel).await.unwrap_err();
    assert!(matches!(err, WatchError::InvalidTimestamp { .. }));
    assert_eq!(watcher.last_update_time(), Some(at(T0)));

    let snapshot = watcher.watch(&cancel).await.unwrap();
    assert_eq!(snapshot.value, "v2");
    assert_eq!(snapshot.update_time, at(T2));
}

#[tokio::test(start_paused = true)]
async fn test_missing_timestamp_is_an_error() {
    let source = MemorySource::new();
    source.set_with_update_time(name(), "v1", None);
    let mut watcher = string_watcher(&source);

    let err = watcher.watch(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WatchError::InvalidTimestamp { .. }));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Limits {
    max_connections: u32,
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_then_recovery() {
    let source = MemorySource::new();
    source.enqueue(name(), Ok(variable(r#"{"max_connections": 10}"#, T0)));
    source.enqueue(name(), Ok(variable("{broken", T1)));
    source.enqueue(name(), Ok(variable(r#"{"max_connections": 20}"#, T2)));
    let mut watcher = Client::new(source.clone())
        .new_variable::<Limits>(&resource(), WatchOptions::new())
        .unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(
        watcher.watch(&cancel).await.unwrap().value,
        Limits { max_connections: 10 }
    );
    assert!(matches!(
        watcher.watch(&cancel).await.unwrap_err(),
        WatchError::Decode(_)
    ));
    assert_eq!(watcher.last_update_time(), Some(at(T0)));
    assert_eq!(
        watcher.watch(&cancel).await.unwrap().value,
        Limits { max_connections: 20 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_is_returned_and_paced() {
    let source = MemorySource::new();
    source.enqueue(name(), Err(FetchError::status(StatusCode::Unavailable, "try later")));
    source.set(name(), "v1");
    let mut watcher = string_watcher(&source);
    let cancel = CancellationToken::new();

    let err = watcher.watch(&cancel).await.unwrap_err();
    assert!(matches!(
        err,
        WatchError::Fetch(FetchError::Status { code: StatusCode::Unavailable, .. })
    ));
    assert!(!watcher.is_deleted());

    // Retrying right away still waits out the interval.
    let start = Instant::now();
    assert_eq!(watcher.watch(&cancel).await.unwrap().value, "v1");
    assert_eq!(Instant::now() - start, WAIT);
}

#[tokio::test(start_paused = true)]
async fn test_client_close_invalidates_waiting_watcher() {
    let source = MemorySource::new();
    source.set(name(), "v1");
    let client = Client::new(source.clone());
    let mut watcher = client
        .new_variable(&resource(), WatchOptions::new().with_decoder(string_decode()))
        .unwrap();
    watcher.watch(&CancellationToken::new()).await.unwrap();

    let closer = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        closer.close();
    });

    let start = Instant::now();
    let err = watcher.watch(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WatchError::ClientClosed));
    assert_eq!(Instant::now() - start, Duration::from_secs(1));
    assert_eq!(source.fetch_count(&name()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchers_are_independent() {
    let source = MemorySource::new();
    let client = Client::new(source.clone());
    let other = ResourceName::new("test-project", "app", "farewell");
    source.set(name(), "hello");
    source.set(other.to_string(), "goodbye");

    let mut greeting = client
        .new_variable(&resource(), WatchOptions::new().with_decoder(string_decode()))
        .unwrap();
    let mut farewell = client
        .new_variable(&other, WatchOptions::new().with_decoder(string_decode()))
        .unwrap();
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(greeting.watch(&cancel), farewell.watch(&cancel));
    assert_eq!(a.unwrap().value, "hello");
    assert_eq!(b.unwrap().value, "goodbye");

    source.delete(&other.to_string());
    assert!(farewell.watch(&cancel).await.unwrap_err().is_not_found());
    assert!(!greeting.is_deleted());

    greeting.close().unwrap();
    farewell.close().unwrap();
}
