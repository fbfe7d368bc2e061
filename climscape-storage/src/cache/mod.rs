//! Keyed cache with single-flight fetches and composite string keys.
//!
//! A [`KeyedCache`] memoizes the result of an async [`Fetcher`] per key.
//! Concurrent callers asking for the same key share one fetch; callers for
//! different keys never wait on each other.
//!
//! # Keys
//!
//! Multi-part selectors (scenario, plane, time, variable, ...) are encoded
//! into one string with [`key::encode`], or held as a [`CompositeKey`].
//! Absent parts are written as the `_` sentinel.
//!
//! # Example
//!
//! ```ignore
//! let cache = KeyedCache::from_fn(CacheConfig::default(), |key: CompositeKey| async move {
//!     load_plane(&key).await
//! });
//!
//! let key = CompositeKey::of(&["base", "horizontal_ground", "time_12", "T"])?;
//! let plane = cache.get(&key).await?;
//!
//! // Non-suspending peek for render paths
//! if let Some(plane) = cache.get_or_null(&key) {
//!     draw(&plane);
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod keyed;
pub mod stats;

pub use config::CacheConfig;
pub use error::FetchError;
pub use fetcher::{fetch_fn, Fetcher, FnFetcher};
pub use key::{CompositeKey, ABSENT, SEPARATOR};
pub use keyed::{EntryStatus, KeyedCache};
pub use stats::CacheStats;
