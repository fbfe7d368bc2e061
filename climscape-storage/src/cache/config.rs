//! Keyed cache configuration.

use std::time::Duration;

/// Configuration for a [`KeyedCache`](super::KeyedCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of settled entries (successes and failures).
    /// Enforced per shard, see [`CacheConfig::per_shard_capacity`]. Zero is
    /// treated as one.
    pub max_entries: usize,
    /// Age after which a cached value is fetched again. `None` keeps values
    /// until evicted or invalidated.
    pub entry_ttl: Option<Duration>,
    /// Number of independently locked slices of the entry map.
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            entry_ttl: None,
            shards: 16,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the max entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }

    /// Set the shard count. Zero is treated as one, and the count never
    /// exceeds `max_entries`.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    fn capacity(&self) -> usize {
        self.max_entries.max(1)
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.clamp(1, self.capacity())
    }

    /// Settled entries allowed in one shard: `max_entries / shards`,
    /// rounded down, so the shards together never hold more than
    /// `max_entries`.
    pub fn per_shard_capacity(&self) -> usize {
        self.capacity() / self.shard_count()
    }
}
