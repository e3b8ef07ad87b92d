//! Core watcher types: scheduling, change detection and construction.

mod client;
mod decoder;
mod options;
mod resource;
mod scheduler;
mod settings;
mod watcher;

pub use client::Client;
pub use decoder::{Decode, Decoder, bytes_decode, json_decode, string_decode};
pub use options::{DEFAULT_WAIT_TIME, WatchOptions};
pub use resource::ResourceName;
pub use scheduler::PollScheduler;
pub use settings::WatchSettings;
pub use watcher::{Snapshot, Watcher};

#[cfg(feature = "yaml")]
pub use decoder::yaml_decode;
