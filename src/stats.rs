//! Statistics and metrics for the memoizer.
//!
//! This module provides atomic counters for tracking cache behavior,
//! enabling observability without impacting performance.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for memoizer operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
/// Use `Memoizer::stats()` to get a snapshot of the current statistics.
///
/// # Example
/// ```ignore
/// let memoizer = Memoizer::new(MemoizerConfig::default());
/// let _ = memoizer.fetch("key", producer).await;
/// let stats = memoizer.stats();
/// println!("populations: {}", stats.populations);
/// ```
#[derive(Debug, Default)]
pub struct MemoStats {
    /// Number of fetches served from the cache (fast path or after waiting
    /// on the key lock).
    hits: AtomicU64,

    /// Number of fetches that found no usable entry after taking the lock.
    misses: AtomicU64,

    /// Number of producer invocations. With single-flight this stays equal
    /// to `misses` no matter how many callers contend.
    populations: AtomicU64,

    /// Number of entries evicted to stay within capacity.
    evictions: AtomicU64,

    /// Number of entries removed because their TTL ran out.
    expirations: AtomicU64,

    /// Number of fetches that gave up waiting for the key lock.
    acquire_timeouts: AtomicU64,

    /// Current number of resident entries.
    size: AtomicU64,
}

impl MemoStats {
    /// Create a new stats instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fetch served from the cache.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch that had to compute its result.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a producer invocation.
    pub fn record_population(&self) {
        self.populations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction (due to capacity).
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an expiration (due to TTL).
    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed-out lock acquisition.
    pub fn record_acquire_timeout(&self) {
        self.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the size counter.
    pub fn increment_size(&self) {
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the size counter.
    pub fn decrement_size(&self) {
        self.size.fetch_sub(1, Ordering::Relaxed);
    }

    /// Set the size to a specific value.
    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    // Getters for reading statistics

    /// Get the number of cache hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the number of cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of producer invocations.
    pub fn populations(&self) -> u64 {
        self.populations.load(Ordering::Relaxed)
    }

    /// Get the number of evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get the number of expirations.
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Get the number of timed-out lock acquisitions.
    pub fn acquire_timeouts(&self) -> u64 {
        self.acquire_timeouts.load(Ordering::Relaxed)
    }

    /// Get the current number of resident entries.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Calculate the hit rate as a percentage (0.0 to 100.0).
    /// Returns 0.0 if no fetches have completed.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Create a snapshot of the current statistics.
    /// This is useful for serialization or logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            populations: self.populations(),
            evictions: self.evictions(),
            expirations: self.expirations(),
            acquire_timeouts: self.acquire_timeouts(),
            size: self.size(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// A point-in-time snapshot of memoizer statistics.
///
/// Unlike `MemoStats`, this struct contains plain values (not atomics)
/// and can be easily serialized or logged.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub populations: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub acquire_timeouts: u64,
    pub size: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_stats() {
        let stats = MemoStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
        assert_eq!(stats.populations(), 0);
        assert_eq!(stats.size(), 0);
    }

    #[test]
    fn test_record_operations() {
        let stats = MemoStats::new();

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_population();
        stats.record_acquire_timeout();

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.populations(), 1);
        assert_eq!(stats.acquire_timeouts(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = MemoStats::new();

        // No fetches = 0% hit rate
        assert_eq!(stats.hit_rate(), 0.0);

        // 3 hits, 1 miss = 75% hit rate
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert!((stats.hit_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_size_tracking() {
        let stats = MemoStats::new();

        stats.increment_size();
        stats.increment_size();
        assert_eq!(stats.size(), 2);

        stats.decrement_size();
        assert_eq!(stats.size(), 1);
    }

    #[test]
    fn test_snapshot() {
        let stats = MemoStats::new();
        stats.record_miss();
        stats.record_population();
        stats.increment_size();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.populations, 1);
        assert_eq!(snapshot.size, 1);
    }
}
