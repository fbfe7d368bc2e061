//! Single-flight behaviour of the keyed cache under a multi-threaded runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use climscape_storage::{CacheConfig, CompositeKey, EntryStatus, KeyedCache};

fn slow_cache(
    delay: Duration,
) -> (KeyedCache<CompositeKey, Arc<Vec<f64>>, String>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = KeyedCache::from_fn(CacheConfig::default(), move |key: CompositeKey| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            match key.token(0) {
                Some("missing") => Err(format!("no data for {}", key)),
                _ => Ok(Arc::new(vec![key.len() as f64])),
            }
        }
    });
    (cache, calls)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_tasks_share_one_fetch_per_key() {
    let (cache, calls) = slow_cache(Duration::from_millis(50));
    let keys = [
        CompositeKey::of(&["base", "horizontal_ground", "time_0", "T"]).unwrap(),
        CompositeKey::of(&["trees", "horizontal_ground", "time_0", "T"]).unwrap(),
    ];

    let mut handles = Vec::new();
    for i in 0..32 {
        let cache = cache.clone();
        let key = keys[i % keys.len()].clone();
        handles.push(tokio::spawn(async move { cache.get(&key).await }));
    }

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // Waiters on the same key observe the same allocation.
    let first = &values[0];
    assert!(values
        .iter()
        .step_by(keys.len())
        .all(|v| Arc::ptr_eq(v, first)));

    let stats = cache.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits + stats.coalesced, 30);
    assert_eq!(stats.entry_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_reaches_every_waiter_and_is_retried() {
    let (cache, calls) = slow_cache(Duration::from_millis(30));
    let key = CompositeKey::new([Some("missing"), None, Some("T")]).unwrap();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get(&key).await })
        })
        .collect();

    for waiter in waiters {
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(
            err.inner().map(String::as_str),
            Some("no data for missing;_;T")
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.status(&key), EntryStatus::Error);

    assert!(cache.get(&key).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn abandoned_fetch_still_settles() {
    let (cache, calls) = slow_cache(Duration::from_millis(20));
    let key = CompositeKey::of(&["base", "vertical_a_a", "time_4", "T"]).unwrap();

    let gave_up = tokio::time::timeout(Duration::from_millis(1), cache.get(&key)).await;
    assert!(gave_up.is_err());
    assert_eq!(cache.status(&key), EntryStatus::Loading);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.status(&key), EntryStatus::Success);
    assert!(cache.get_or_null(&key).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
