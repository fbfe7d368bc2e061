//! Climscape Storage - Keyed Cache and Simulation Sources
//!
//! The single-flight [`KeyedCache`] used by every results service, the
//! composite key codec, and the [`SimulationSource`] abstraction over where
//! simulation documents are read from.

pub mod cache;
pub mod source;

pub use cache::{
    fetch_fn, CacheConfig, CacheStats, CompositeKey, EntryStatus, FetchError, Fetcher, FnFetcher,
    KeyedCache,
};
pub use source::{DirectorySource, SimulationSource};
