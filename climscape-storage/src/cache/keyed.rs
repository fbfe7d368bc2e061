//! Keyed async cache with single-flight fetch coalescing.
//!
//! Every key moves through `Idle → Loading → Success | Error`. While a key
//! is `Loading`, all callers attach to the same shared fetch; the fetch runs
//! as its own task and settles the entry before waking anyone, so callers
//! that arrive after settlement see the stored outcome. Errors are stored
//! but not sticky: the next `get` after a failure fetches again.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace, warn};

use super::config::CacheConfig;
use super::error::FetchError;
use super::fetcher::{fetch_fn, Fetcher};
use super::stats::{CacheStats, StatsCounters};

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, FetchError<E>>>>;

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

enum CacheEntry<T, E> {
    Loading {
        generation: u64,
        flight: Flight<T, E>,
    },
    Success {
        value: T,
        stored_at: Instant,
        last_access: Instant,
    },
    Error {
        error: FetchError<E>,
        last_access: Instant,
    },
}

impl<T, E> CacheEntry<T, E> {
    /// Last access time of a settled entry, `None` while loading.
    fn settled_at(&self) -> Option<Instant> {
        match self {
            CacheEntry::Loading { .. } => None,
            CacheEntry::Success { last_access, .. } | CacheEntry::Error { last_access, .. } => {
                Some(*last_access)
            }
        }
    }
}

enum Lookup<T, E> {
    Hit(T),
    Join(Flight<T, E>),
    Miss,
}

type Shard<K, T, E> = Mutex<HashMap<K, CacheEntry<T, E>>>;

struct Inner<K, T, E> {
    shards: Box<[Shard<K, T, E>]>,
    hasher: RandomState,
    fetcher: Arc<dyn Fetcher<K, T, E>>,
    config: CacheConfig,
    next_generation: AtomicU64,
    stats: StatsCounters,
}

/// Memoizing cache that runs at most one fetch per key at a time.
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// `get` spawns fetches on the ambient tokio runtime and panics when called
/// outside of one.
pub struct KeyedCache<K, T, E> {
    inner: Arc<Inner<K, T, E>>,
}

impl<K, T, E> Clone for KeyedCache<K, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T, E> fmt::Debug for KeyedCache<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<K, T, E> KeyedCache<K, T, E>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Create a cache around an injected fetcher.
    pub fn new(fetcher: Arc<dyn Fetcher<K, T, E>>, config: CacheConfig) -> Self {
        let shards = (0..config.shard_count())
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                shards,
                hasher: RandomState::new(),
                fetcher,
                config,
                next_generation: AtomicU64::new(0),
                stats: StatsCounters::default(),
            }),
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults(fetcher: Arc<dyn Fetcher<K, T, E>>) -> Self {
        Self::new(fetcher, CacheConfig::default())
    }

    /// Create a cache whose fetcher is an async closure.
    pub fn from_fn<F, Fut>(config: CacheConfig, f: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(Arc::new(fetch_fn(f)), config)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get the value for `key`, fetching it if needed.
    ///
    /// - cached and fresh: returned without any work
    /// - loading: waits for the fetch already in flight
    /// - idle, failed or expired: starts a new fetch
    ///
    /// Every caller attached to one fetch receives the same outcome.
    pub async fn get(&self, key: &K) -> Result<T, FetchError<E>> {
        let flight = {
            let mut shard = self.inner.lock_shard(key);
            let now = Instant::now();
            let lookup = match shard.get_mut(key) {
                Some(CacheEntry::Success {
                    value,
                    stored_at,
                    last_access,
                }) if !self.inner.is_expired(*stored_at, now) => {
                    *last_access = now;
                    Lookup::Hit(value.clone())
                }
                Some(CacheEntry::Loading { flight, .. }) => Lookup::Join(flight.clone()),
                _ => Lookup::Miss,
            };

            match lookup {
                Lookup::Hit(value) => {
                    StatsCounters::bump(&self.inner.stats.hits);
                    trace!(key = ?key, "cache hit");
                    return Ok(value);
                }
                Lookup::Join(flight) => {
                    StatsCounters::bump(&self.inner.stats.coalesced);
                    trace!(key = ?key, "joining fetch in flight");
                    flight
                }
                Lookup::Miss => {
                    let (generation, flight) = Inner::start_fetch(&self.inner, key);
                    shard.insert(
                        key.clone(),
                        CacheEntry::Loading {
                            generation,
                            flight: flight.clone(),
                        },
                    );
                    flight
                }
            }
        };

        flight.await
    }

    /// Peek at a cached value without suspending and without fetching.
    pub fn get_or_null(&self, key: &K) -> Option<T> {
        let mut shard = self.inner.lock_shard(key);
        let now = Instant::now();
        match shard.get_mut(key) {
            Some(CacheEntry::Success {
                value,
                stored_at,
                last_access,
            }) if !self.inner.is_expired(*stored_at, now) => {
                *last_access = now;
                StatsCounters::bump(&self.inner.stats.hits);
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Current state of `key`. An expired value reports `Idle`.
    pub fn status(&self, key: &K) -> EntryStatus {
        let shard = self.inner.lock_shard(key);
        match shard.get(key) {
            None => EntryStatus::Idle,
            Some(CacheEntry::Loading { .. }) => EntryStatus::Loading,
            Some(CacheEntry::Success { stored_at, .. }) => {
                if self.inner.is_expired(*stored_at, Instant::now()) {
                    EntryStatus::Idle
                } else {
                    EntryStatus::Success
                }
            }
            Some(CacheEntry::Error { .. }) => EntryStatus::Error,
        }
    }

    /// The stored failure of `key`, if its last fetch failed.
    pub fn last_error(&self, key: &K) -> Option<FetchError<E>> {
        match self.inner.lock_shard(key).get(key) {
            Some(CacheEntry::Error { error, .. }) => Some(error.clone()),
            _ => None,
        }
    }

    /// Forget `key`. A fetch in flight keeps running and still answers its
    /// waiters, but its outcome is not stored.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.inner.lock_shard(key).remove(key).is_some();
        if removed {
            debug!(key = ?key, "cache entry invalidated");
        }
        removed
    }

    /// Forget every key.
    pub fn clear(&self) {
        for shard in self.inner.shards.iter() {
            shard.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Number of entries in any state.
    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.len() as u64)
    }
}

impl<K, T, E> Inner<K, T, E>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    fn lock_shard(&self, key: &K) -> MutexGuard<'_, HashMap<K, CacheEntry<T, E>>> {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, stored_at: Instant, now: Instant) -> bool {
        match self.config.entry_ttl {
            Some(ttl) => now.saturating_duration_since(stored_at) >= ttl,
            None => false,
        }
    }

    /// Spawn the fetch for `key` and return its shared handle.
    ///
    /// The spawned task settles the entry itself, so the fetch completes and
    /// is recorded even if every waiter goes away.
    fn start_fetch(this: &Arc<Self>, key: &K) -> (u64, Flight<T, E>) {
        let generation = this.next_generation.fetch_add(1, Ordering::Relaxed);
        StatsCounters::bump(&this.stats.misses);
        debug!(key = ?key, generation, "starting fetch");

        let task = {
            let inner = Arc::clone(this);
            let key = key.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let result = inner
                    .fetcher
                    .fetch(&key)
                    .await
                    .map_err(FetchError::from_source);
                inner.settle(&key, generation, &result, started.elapsed());
                result
            })
        };

        let weak: Weak<Self> = Arc::downgrade(this);
        let key = key.clone();
        let flight = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    let result = Err(FetchError::Interrupted {
                        reason: join_error.to_string(),
                    });
                    if let Some(inner) = weak.upgrade() {
                        inner.settle(&key, generation, &result, Duration::ZERO);
                    }
                    result
                }
            }
        }
        .boxed()
        .shared();

        (generation, flight)
    }

    /// Record the outcome of fetch `generation`, unless the entry was
    /// invalidated or replaced in the meantime.
    fn settle(&self, key: &K, generation: u64, result: &Result<T, FetchError<E>>, elapsed: Duration) {
        let mut shard = self.lock_shard(key);
        match shard.get(key) {
            Some(CacheEntry::Loading { generation: current, .. }) if *current == generation => {}
            _ => {
                debug!(key = ?key, generation, "discarding outcome of detached fetch");
                return;
            }
        }

        let now = Instant::now();
        let entry = match result {
            Ok(value) => {
                debug!(key = ?key, generation, elapsed_ms = elapsed.as_millis() as u64, "fetch settled");
                CacheEntry::Success {
                    value: value.clone(),
                    stored_at: now,
                    last_access: now,
                }
            }
            Err(error) => {
                StatsCounters::bump(&self.stats.failures);
                warn!(key = ?key, generation, error = %error, "fetch failed");
                if error.inner().is_some_and(|e| !self.fetcher.retain_error(e)) {
                    shard.remove(key);
                    return;
                }
                CacheEntry::Error {
                    error: error.clone(),
                    last_access: now,
                }
            }
        };
        shard.insert(key.clone(), entry);
        self.enforce_capacity(&mut shard, key);
    }

    /// Evict least recently used settled entries until the shard fits.
    /// Loading entries are never evicted and `keep` is spared.
    fn enforce_capacity(&self, shard: &mut HashMap<K, CacheEntry<T, E>>, keep: &K) {
        let capacity = self.config.per_shard_capacity();
        loop {
            let settled = shard.values().filter(|e| e.settled_at().is_some()).count();
            if settled <= capacity {
                return;
            }
            let victim = shard
                .iter()
                .filter(|(k, _)| *k != keep)
                .filter_map(|(k, e)| e.settled_at().map(|at| (k, at)))
                .min_by_key(|(_, at)| *at)
                .map(|(k, _)| k.clone());
            let Some(victim) = victim else {
                return;
            };
            shard.remove(&victim);
            StatsCounters::bump(&self.stats.evictions);
            trace!(key = ?victim, "evicted least recently used entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Fetcher that counts calls and waits for a permit before answering.
    struct GatedFetcher {
        calls: AtomicUsize,
        gate: Notify,
        fail_first: bool,
    }

    impl GatedFetcher {
        fn new(fail_first: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                fail_first,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetcher<String, String, String> for GatedFetcher {
        async fn fetch(&self, key: &String) -> Result<String, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.fail_first && call == 0 {
                Err(format!("{} unavailable", key))
            } else {
                Ok(format!("value:{}", key))
            }
        }
    }

    fn counting_cache(config: CacheConfig) -> (KeyedCache<String, String, String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = KeyedCache::from_fn(config, move |key: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(format!("value:{}", key))
            }
        });
        (cache, calls)
    }

    async fn wait_for(cache: &KeyedCache<String, String, String>, key: &String, status: EntryStatus) {
        while cache.status(key) != status {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let fetcher = GatedFetcher::new(false);
        let cache: KeyedCache<String, String, String> =
            KeyedCache::with_defaults(fetcher.clone());
        let key = "k".to_string();

        let release = async {
            fetcher.gate.notify_one();
        };
        let (a, b, c, ()) = tokio::join!(cache.get(&key), cache.get(&key), cache.get(&key), release);

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a.unwrap(), "value:k");
        assert_eq!(b.unwrap(), "value:k");
        assert_eq!(c.unwrap(), "value:k");

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.coalesced, 2);
    }

    #[tokio::test]
    async fn test_success_is_served_without_fetching() {
        let (cache, calls) = counting_cache(CacheConfig::default());
        let key = "plane".to_string();

        assert_eq!(cache.get(&key).await.unwrap(), "value:plane");
        assert_eq!(cache.get(&key).await.unwrap(), "value:plane");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(&key), EntryStatus::Success);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_get_or_null_never_fetches() {
        let (cache, calls) = counting_cache(CacheConfig::default());
        let key = "peek".to_string();

        assert_eq!(cache.get_or_null(&key), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.status(&key), EntryStatus::Idle);

        cache.get(&key).await.unwrap();
        assert_eq!(cache.get_or_null(&key).as_deref(), Some("value:peek"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_null_while_loading_is_none() {
        let fetcher = GatedFetcher::new(false);
        let cache: KeyedCache<String, String, String> =
            KeyedCache::with_defaults(fetcher.clone());
        let key = "slow".to_string();

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get(&key).await })
        };
        wait_for(&cache, &key, EntryStatus::Loading).await;
        assert_eq!(cache.get_or_null(&key), None);

        fetcher.gate.notify_one();
        assert_eq!(waiter.await.unwrap().unwrap(), "value:slow");
        assert_eq!(cache.get_or_null(&key).as_deref(), Some("value:slow"));
    }

    #[tokio::test]
    async fn test_failure_is_replayed_then_retried() {
        let fetcher = GatedFetcher::new(true);
        let cache: KeyedCache<String, String, String> =
            KeyedCache::with_defaults(fetcher.clone());
        let key = "flaky".to_string();

        let release = async {
            fetcher.gate.notify_one();
        };
        let (a, b, ()) = tokio::join!(cache.get(&key), cache.get(&key), release);
        let (a, b) = (a.unwrap_err(), b.unwrap_err());
        assert_eq!(a.inner().map(String::as_str), Some("flaky unavailable"));
        assert_eq!(b.inner(), a.inner());
        assert_eq!(cache.status(&key), EntryStatus::Error);
        assert!(cache.last_error(&key).is_some());
        assert_eq!(cache.stats().failures, 1);

        fetcher.gate.notify_one();
        assert_eq!(cache.get(&key).await.unwrap(), "value:flaky");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.status(&key), EntryStatus::Success);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_wait_on_each_other() {
        let fetcher = GatedFetcher::new(false);
        let slow_cache: KeyedCache<String, String, String> =
            KeyedCache::with_defaults(fetcher.clone());
        let blocked = "blocked".to_string();

        let waiter = {
            let cache = slow_cache.clone();
            let key = blocked.clone();
            tokio::spawn(async move { cache.get(&key).await })
        };
        wait_for(&slow_cache, &blocked, EntryStatus::Loading).await;

        // A second key starts its own fetch while the first is still pending.
        let other = {
            let cache = slow_cache.clone();
            tokio::spawn(async move { cache.get(&"free".to_string()).await })
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("second key should fetch while the first is pending");
        assert_eq!(slow_cache.status(&"free".to_string()), EntryStatus::Loading);

        fetcher.gate.notify_one();
        fetcher.gate.notify_one();
        assert!(waiter.await.unwrap().is_ok());
        assert!(other.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_while_loading_discards_outcome() {
        let fetcher = GatedFetcher::new(false);
        let cache: KeyedCache<String, String, String> =
            KeyedCache::with_defaults(fetcher.clone());
        let key = "moving".to_string();

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get(&key).await })
        };
        wait_for(&cache, &key, EntryStatus::Loading).await;
        assert!(cache.invalidate(&key));

        fetcher.gate.notify_one();
        assert_eq!(waiter.await.unwrap().unwrap(), "value:moving");
        assert_eq!(cache.status(&key), EntryStatus::Idle);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_value_is_fetched_again() {
        let (cache, calls) =
            counting_cache(CacheConfig::new().with_ttl(Duration::from_millis(20)));
        let key = "ttl".to_string();

        cache.get(&key).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.status(&key), EntryStatus::Idle);
        assert_eq!(cache.get_or_null(&key), None);

        cache.get(&key).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let (cache, calls) = counting_cache(CacheConfig::new().with_shards(1).with_max_entries(2));
        let (a, b, c) = ("a".to_string(), "b".to_string(), "c".to_string());

        cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.get(&a).await.unwrap();
        cache.get(&c).await.unwrap();

        assert_eq!(cache.status(&a), EntryStatus::Success);
        assert_eq!(cache.status(&b), EntryStatus::Idle);
        assert_eq!(cache.status(&c), EntryStatus::Success);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_len_stays_within_max_entries_with_default_shards() {
        let (cache, calls) = counting_cache(CacheConfig::new().with_max_entries(4));

        for i in 0..64 {
            cache.get(&format!("key-{}", i)).await.unwrap();
            assert!(cache.len() <= 4);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 64);
        assert!(cache.stats().evictions >= 60);
    }

    /// Fails every key and keeps only failures marked transient.
    struct SelectiveFetcher;

    #[async_trait::async_trait]
    impl Fetcher<String, String, String> for SelectiveFetcher {
        async fn fetch(&self, key: &String) -> Result<String, String> {
            Err(format!("{} failed", key))
        }

        fn retain_error(&self, error: &String) -> bool {
            !error.starts_with("shape")
        }
    }

    #[tokio::test]
    async fn test_unretained_error_leaves_key_idle() {
        let cache: KeyedCache<String, String, String> =
            KeyedCache::new(Arc::new(SelectiveFetcher), CacheConfig::default());
        let (shape, io) = ("shape".to_string(), "io".to_string());

        let err = cache.get(&shape).await.unwrap_err();
        assert_eq!(err.inner().map(String::as_str), Some("shape failed"));
        assert_eq!(cache.status(&shape), EntryStatus::Idle);
        assert!(cache.last_error(&shape).is_none());

        cache.get(&io).await.unwrap_err();
        assert_eq!(cache.status(&io), EntryStatus::Error);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().failures, 2);
    }

    #[tokio::test]
    async fn test_panicking_fetcher_reports_interrupted() {
        let cache: KeyedCache<String, String, String> =
            KeyedCache::from_fn(CacheConfig::default(), |key: String| async move {
                if key == "bad" {
                    panic!("fetcher bug");
                }
                Ok::<_, String>(key)
            });
        let key = "bad".to_string();

        let err = cache.get(&key).await.unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(cache.status(&key), EntryStatus::Error);
        assert_eq!(cache.get(&"good".to_string()).await.unwrap(), "good");
    }

    #[tokio::test]
    async fn test_clear_forgets_everything() {
        let (cache, calls) = counting_cache(CacheConfig::default());
        for k in ["x", "y", "z"] {
            cache.get(&k.to_string()).await.unwrap();
        }
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
        cache.get(&"x".to_string()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
