//! The main memoization interface.
//!
//! This module provides the primary `Memoizer` type: a bounded, expiring
//! result cache combined with a per-key lock registry so that concurrent
//! callers for the same key collapse into a single producer invocation.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MemoizerConfig;
use crate::error::MemoizeError;
use crate::registry::{KeyGuard, LockRegistry};
use crate::stats::{MemoStats, StatsSnapshot};
use crate::store::Store;

/// A thread-safe, single-flight memoization cache with TTL expiry.
///
/// # Guarantees
/// - **Single-flight**: for any key, concurrent fetchers trigger at most one
///   producer invocation per cache-miss episode; everyone else reuses the
///   result (or re-checks the cache after waiting on the key's lock).
/// - **Bounded**: at most `capacity` entries are resident; the oldest entry
///   by insertion is evicted first.
/// - **Expiring**: results live for `ttl` from the moment they are stored,
///   after which the next fetch recomputes them.
/// - **Failure is never cached**: a failing producer propagates its error
///   to the caller that ran it and leaves the cache untouched, so the next
///   fetch retries.
///
/// Cloning a `Memoizer` creates a new handle to the same underlying cache
/// and lock registry.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use single_flight_cache::{Memoizer, MemoizerConfig};
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// let config = MemoizerConfig::new()
///     .ttl(Duration::from_secs(300))
///     .capacity(1_000)
///     .build();
/// let memoizer: Memoizer<u64, u64> = Memoizer::new(config);
///
/// let value = memoizer
///     .fetch(7, || async { Ok::<_, Infallible>(7 * 7) })
///     .await
///     .unwrap();
/// assert_eq!(value, 49);
///
/// // Served from cache; the producer does not run again.
/// let value = memoizer
///     .fetch(7, || async { Ok::<_, Infallible>(unreachable!()) })
///     .await
///     .unwrap();
/// assert_eq!(value, 49);
/// # }
/// ```
pub struct Memoizer<K, V> {
    inner: Arc<Inner<K, V>>,
}

struct Inner<K, V> {
    store: Store<K, V>,
    locks: LockRegistry<K>,
    stats: Arc<MemoStats>,
}

impl<K, V> Clone for Memoizer<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Memoizer<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer").finish_non_exhaustive()
    }
}

impl<K, V> Default for Memoizer<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new(MemoizerConfig::default())
    }
}

impl<K, V> Memoizer<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a new memoizer with the given configuration.
    ///
    /// # Example
    /// ```
    /// use single_flight_cache::{Memoizer, MemoizerConfig};
    ///
    /// let memoizer: Memoizer<String, String> = Memoizer::new(MemoizerConfig::default());
    /// ```
    pub fn new(config: MemoizerConfig) -> Self {
        let stats = Arc::new(MemoStats::new());
        Self {
            inner: Arc::new(Inner {
                store: Store::new(&config, Arc::clone(&stats)),
                locks: LockRegistry::new(),
                stats,
            }),
        }
    }

    /// Return the cached value for `key`, or run `producer` to compute it.
    ///
    /// The fast path is a plain cache read with no per-key lock taken. On a
    /// miss the key's lock is acquired, the cache is re-checked (another
    /// caller may have populated it while this one waited), and only then
    /// does the producer run. Its result is stored with expiry `now + ttl`.
    ///
    /// The lock is released on every exit path, including producer failure
    /// and cancellation, so a failed fetch never wedges the key.
    pub async fn fetch<F, Fut, E>(&self, key: K, producer: F) -> Result<V, MemoizeError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            return Ok(value);
        }

        let guard = self.inner.locks.acquire(key).await;
        self.fill(guard, producer).await
    }

    /// Like [`fetch`](Self::fetch), but gives up with
    /// [`MemoizeError::AcquireTimeout`] if the key's lock cannot be
    /// obtained within `acquire_timeout`.
    ///
    /// On timeout the producer is not invoked and the cache is untouched;
    /// the registry keeps no record of the failed attempt.
    pub async fn fetch_timeout<F, Fut, E>(
        &self,
        key: K,
        acquire_timeout: Duration,
        producer: F,
    ) -> Result<V, MemoizeError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            return Ok(value);
        }

        match self
            .inner
            .locks
            .acquire_timeout(key.clone(), acquire_timeout)
            .await
        {
            Some(guard) => self.fill(guard, producer).await,
            None => {
                self.inner.stats.record_acquire_timeout();
                tracing::debug!(?key, "gave up waiting for key lock");
                Err(MemoizeError::AcquireTimeout)
            }
        }
    }

    /// Synchronous counterpart of [`fetch`](Self::fetch) for thread-based
    /// callers, with the same single-flight guarantees. Blocking and async
    /// fetchers for the same key serialize against the same lock.
    ///
    /// # Panics
    /// Panics if called from within an async runtime; use
    /// [`fetch`](Self::fetch) there instead.
    ///
    /// # Example
    /// ```
    /// use single_flight_cache::{Memoizer, MemoizerConfig};
    ///
    /// let memoizer: Memoizer<String, String> = Memoizer::new(MemoizerConfig::default());
    ///
    /// let value = memoizer
    ///     .fetch_blocking("user:123".to_string(), || {
    ///         Ok::<_, std::io::Error>("Alice".to_string())
    ///     })
    ///     .unwrap();
    /// assert_eq!(value, "Alice");
    /// ```
    pub fn fetch_blocking<F, E>(&self, key: K, producer: F) -> Result<V, MemoizeError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            return Ok(value);
        }

        let guard = self.inner.locks.acquire_blocking(key);

        // Re-check: another caller may have populated the entry while this
        // one waited for the lock.
        let key = guard.key().clone();
        if let Some(value) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            return Ok(value);
        }

        self.inner.stats.record_miss();
        self.inner.stats.record_population();
        tracing::trace!(?key, "cache miss, invoking producer");

        let value = producer().map_err(MemoizeError::Producer)?;
        self.inner.store.insert(key, value.clone());
        drop(guard);
        Ok(value)
    }

    /// Wrap a producer into a reusable memoized callable.
    ///
    /// The argument value doubles as the cache key, so the memoized call
    /// has the same argument and return shape as the producer itself. Wrap
    /// per-call context arguments in [`Transient`](crate::Transient) to
    /// keep them out of key identity.
    ///
    /// # Example
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use single_flight_cache::{Memoizer, MemoizerConfig};
    /// use std::convert::Infallible;
    ///
    /// let memoizer: Memoizer<String, usize> = Memoizer::new(MemoizerConfig::default());
    /// let word_len = memoizer.wrap(|word: String| async move {
    ///     Ok::<_, Infallible>(word.len())
    /// });
    ///
    /// assert_eq!(word_len.call("hello".to_string()).await.unwrap(), 5);
    /// # }
    /// ```
    pub fn wrap<F>(&self, producer: F) -> Memoized<K, V, F> {
        Memoized {
            memoizer: self.clone(),
            producer,
        }
    }

    /// Number of resident entries.
    ///
    /// Note: this may include expired entries that have not been swept yet.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a key holds a non-expired value, without fetching it.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.store.contains(key)
    }

    /// Remove all cached entries. In-flight computations are unaffected.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Remove expired entries eagerly, returning how many were dropped.
    ///
    /// Expired entries are also dropped lazily when read, so calling this
    /// is only useful to reclaim memory ahead of time.
    pub fn cleanup_expired(&self) -> usize {
        self.inner.store.cleanup_expired()
    }

    /// Number of keys with an in-flight or contended computation.
    ///
    /// Returns to zero once all fetchers for a key have finished; useful
    /// for verifying that lock bookkeeping does not leak.
    pub fn in_flight(&self) -> usize {
        self.inner.locks.len()
    }

    /// Get a snapshot of the memoizer statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Get a reference to the internal statistics counters.
    ///
    /// This is useful for integrating with external metrics systems.
    pub fn stats_ref(&self) -> Arc<MemoStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Double-checked populate step, run while holding the key's lock.
    ///
    /// Takes the guard by value so that every exit path, including a
    /// producer failure surfacing through `?` or the future being dropped,
    /// releases the lock.
    async fn fill<F, Fut, E>(
        &self,
        guard: KeyGuard<K>,
        producer: F,
    ) -> Result<V, MemoizeError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = guard.key().clone();

        // Re-check: another caller may have populated the entry while this
        // one waited for the lock.
        if let Some(value) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            return Ok(value);
        }

        self.inner.stats.record_miss();
        self.inner.stats.record_population();
        tracing::trace!(?key, "cache miss, invoking producer");

        let value = producer().await.map_err(MemoizeError::Producer)?;
        self.inner.store.insert(key, value.clone());
        drop(guard);
        Ok(value)
    }
}

/// A producer bundled with the memoizer that caches its results.
///
/// Created by [`Memoizer::wrap`]. The same wrapper serves both call
/// styles: [`call`](Memoized::call) when the producer returns a future,
/// [`call_blocking`](Memoized::call_blocking) when it returns a plain
/// `Result`.
pub struct Memoized<K, V, F> {
    memoizer: Memoizer<K, V>,
    producer: F,
}

impl<K, V, F> Memoized<K, V, F>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    /// Invoke the memoized producer with `args`, which also serve as the
    /// cache key.
    pub async fn call<Fut, E>(&self, args: K) -> Result<V, MemoizeError<E>>
    where
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = args.clone();
        self.memoizer.fetch(key, || (self.producer)(args)).await
    }

    /// Synchronous counterpart of [`call`](Memoized::call).
    ///
    /// # Panics
    /// Panics if called from within an async runtime.
    pub fn call_blocking<E>(&self, args: K) -> Result<V, MemoizeError<E>>
    where
        F: Fn(K) -> Result<V, E>,
    {
        let key = args.clone();
        self.memoizer.fetch_blocking(key, || (self.producer)(args))
    }

    /// Handle to the memoizer backing this wrapper.
    pub fn memoizer(&self) -> &Memoizer<K, V> {
        &self.memoizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transient;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_memoizer() -> (Memoizer<String, u32>, Arc<AtomicUsize>) {
        (
            Memoizer::new(MemoizerConfig::default()),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    #[tokio::test]
    async fn test_fetch_caches_result() {
        let (memoizer, calls) = counting_memoizer();

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = memoizer
                .fetch("a".to_string(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memoizer.len(), 1);
        assert!(memoizer.contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_producer_failure_is_not_cached() {
        let (memoizer, calls) = counting_memoizer();

        let calls2 = Arc::clone(&calls);
        let result = memoizer
            .fetch("a".to_string(), || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("boom")
            })
            .await;
        assert_eq!(result, Err(MemoizeError::Producer("boom")));
        assert!(memoizer.is_empty());

        let calls3 = Arc::clone(&calls);
        let value = memoizer
            .fetch("a".to_string(), || async move {
                calls3.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_releases_the_key_lock() {
        let memoizer: Memoizer<String, u32> = Memoizer::new(MemoizerConfig::default());

        let result = memoizer
            .fetch("a".to_string(), || async { Err::<u32, _>("boom") })
            .await;
        assert!(result.is_err());
        assert_eq!(memoizer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_clone_shares_cache() {
        let (memoizer, calls) = counting_memoizer();
        let other = memoizer.clone();

        let calls2 = Arc::clone(&calls);
        memoizer
            .fetch("a".to_string(), || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(1)
            })
            .await
            .unwrap();

        let value = other
            .fetch("a".to_string(), || async {
                Ok::<_, Infallible>(unreachable!())
            })
            .await
            .unwrap();
        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats_tracking() {
        let memoizer: Memoizer<String, u32> = Memoizer::new(MemoizerConfig::default());

        memoizer
            .fetch("a".to_string(), || async { Ok::<_, Infallible>(1) })
            .await
            .unwrap();
        memoizer
            .fetch("a".to_string(), || async { Ok::<_, Infallible>(1) })
            .await
            .unwrap();

        let stats = memoizer.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.populations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_transient_args_share_an_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer: Memoizer<(String, Transient<u64>), u32> =
            Memoizer::new(MemoizerConfig::default());

        for session in [1u64, 2, 3] {
            let calls = Arc::clone(&calls);
            let value = memoizer
                .fetch(("query".to_string(), Transient(session)), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(99)
                })
                .await
                .unwrap();
            assert_eq!(value, 99);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memoizer.len(), 1);
    }

    #[test]
    fn test_fetch_blocking_caches_result() {
        let (memoizer, calls) = counting_memoizer();

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = memoizer
                .fetch_blocking("a".to_string(), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(42)
                })
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer: Memoizer<String, usize> = Memoizer::new(MemoizerConfig::default());

        let calls2 = Arc::clone(&calls);
        let word_len = memoizer.wrap(move |word: String| {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(word.len())
            }
        });

        assert_eq!(word_len.call("hello".to_string()).await.unwrap(), 5);
        assert_eq!(word_len.call("hello".to_string()).await.unwrap(), 5);
        assert_eq!(word_len.call("hi".to_string()).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(word_len.memoizer().len(), 2);
    }

    #[test]
    fn test_wrap_call_blocking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer: Memoizer<u32, u32> = Memoizer::new(MemoizerConfig::default());

        let calls2 = Arc::clone(&calls);
        let double = memoizer.wrap(move |n: u32| {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(n * 2)
        });

        assert_eq!(double.call_blocking(21).unwrap(), 42);
        assert_eq!(double.call_blocking(21).unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
