//! Keeping a variable's latest value available to readers.
//!
//! [`LatestValue`] runs a watcher in a background task and publishes every
//! change through a lock-free cell and a change signal.

mod latest;

pub use latest::LatestValue;
