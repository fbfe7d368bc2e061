//! The fetch boundary of the keyed cache.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

/// Produces the value for a key on cache miss.
///
/// Implementations must tolerate concurrent calls for distinct keys and
/// should be retriable: a failed key is fetched again on the next `get`.
#[async_trait]
pub trait Fetcher<K, T, E>: Send + Sync {
    async fn fetch(&self, key: &K) -> Result<T, E>;

    /// Whether `error` is stored as the key's `Error` entry. When `false`
    /// the key returns to idle; waiters of the failed fetch still see it.
    fn retain_error(&self, _error: &E) -> bool {
        true
    }
}

/// Adapter turning an async closure into a [`Fetcher`].
pub struct FnFetcher<F, K> {
    f: F,
    _key: PhantomData<fn(K)>,
}

/// Wrap `f` so it can be handed to a cache.
pub fn fetch_fn<F, K>(f: F) -> FnFetcher<F, K> {
    FnFetcher {
        f,
        _key: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, K, T, E> Fetcher<K, T, E> for FnFetcher<F, K>
where
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    K: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn fetch(&self, key: &K) -> Result<T, E> {
        (self.f)(key.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_fetcher_passes_owned_key() {
        let fetcher = fetch_fn(|key: String| async move { Ok::<_, ()>(key.len()) });
        assert_eq!(fetcher.fetch(&"abcd".to_string()).await, Ok(4));
    }

    #[tokio::test]
    async fn test_fn_fetcher_propagates_error() {
        let fetcher = fetch_fn(|key: u32| async move {
            if key == 0 {
                Err("zero")
            } else {
                Ok(key * 2)
            }
        });
        assert_eq!(fetcher.fetch(&0).await, Err("zero"));
        assert_eq!(fetcher.fetch(&21).await, Ok(42));
    }
}
