//! Variable source implementations.

mod memory;
mod variable_source;

#[cfg(feature = "http")]
mod http;

pub use memory::MemorySource;
pub use variable_source::{Contents, FetchError, RemoteVariable, StatusCode, VariableSource};

#[cfg(feature = "http")]
pub use http::{DEFAULT_ENDPOINT, RuntimeConfigSource, RuntimeConfigSourceBuilder};
