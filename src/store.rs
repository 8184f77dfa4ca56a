//! Bounded expiring storage for memoized results.
//!
//! This module provides the low-level storage using an `IndexMap` for
//! maintaining insertion order (used for oldest-first eviction).
//!
//! Reads only take the shared side of the lock; an expired or stale read is
//! treated as a miss, never returned as fresh, so the worst outcome of a
//! race is a redundant recomputation. Writes happen while the caller holds
//! the key's per-key lock, one key at a time.

use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::config::MemoizerConfig;
use crate::entry::Entry;
use crate::stats::MemoStats;

/// Thread-safe bounded map of results with absolute expiry times.
///
/// This is the internal implementation; users interact with
/// [`Memoizer`](crate::Memoizer) instead.
#[derive(Debug)]
pub(crate) struct Store<K, V> {
    /// The actual storage, protected by a read-write lock.
    /// IndexMap maintains insertion order, which we use for eviction.
    entries: RwLock<IndexMap<K, Entry<V>>>,

    /// Maximum number of resident entries, always at least 1.
    capacity: usize,

    /// Lifetime applied to every stored result.
    ttl: Duration,

    /// Shared statistics for eviction and expiry accounting.
    stats: Arc<MemoStats>,
}

impl<K: Hash + Eq + Clone, V: Clone> Store<K, V> {
    /// Create a new store with the given configuration.
    pub(crate) fn new(config: &MemoizerConfig, stats: Arc<MemoStats>) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            capacity: config.capacity.max(1),
            ttl: config.ttl,
            stats,
        }
    }

    /// Get a non-expired value.
    ///
    /// An expired entry reads as absent and is removed on the way out.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let expired = {
            let entries = self.read_lock()?;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value().clone()),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            // Removal needs the write lock, so re-check under it.
            self.remove_expired(key);
        }
        None
    }

    /// Store a value with expiry `now + ttl`, evicting the oldest entries
    /// first if the write would exceed capacity.
    pub(crate) fn insert(&self, key: K, value: V) {
        let entry = Entry::new(value, Instant::now() + self.ttl);

        let mut entries = match self.write_lock() {
            Some(e) => e,
            None => return, // Lock poisoned, silently fail
        };

        // A repopulated key counts as a fresh insertion for eviction order.
        if entries.shift_remove(&key).is_some() {
            self.stats.decrement_size();
        }

        while entries.len() >= self.capacity {
            self.evict_one(&mut entries);
        }

        entries.insert(key, entry);
        self.stats.increment_size();
    }

    /// Check if a key holds a non-expired value.
    pub(crate) fn contains(&self, key: &K) -> bool {
        let entries = match self.read_lock() {
            Some(e) => e,
            None => return false,
        };

        match entries.get(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    /// Number of resident entries.
    ///
    /// Note: this may include expired entries that have not been swept yet.
    pub(crate) fn len(&self) -> usize {
        match self.read_lock() {
            Some(entries) => entries.len(),
            None => 0,
        }
    }

    /// Remove all entries.
    pub(crate) fn clear(&self) {
        if let Some(mut entries) = self.write_lock() {
            entries.clear();
            self.stats.set_size(0);
        }
    }

    /// Remove all expired entries, returning how many were dropped.
    pub(crate) fn cleanup_expired(&self) -> usize {
        let mut entries = match self.write_lock() {
            Some(e) => e,
            None => return 0,
        };

        let initial_len = entries.len();
        let now = Instant::now();

        entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                self.stats.record_expiration();
                self.stats.decrement_size();
            }
            !expired
        });

        let removed = initial_len - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired entries");
        }
        removed
    }

    // Private helper methods

    /// Acquire a read lock, returning None if poisoned.
    fn read_lock(&self) -> Option<RwLockReadGuard<'_, IndexMap<K, Entry<V>>>> {
        self.entries.read().ok()
    }

    /// Acquire a write lock, returning None if poisoned.
    fn write_lock(&self) -> Option<RwLockWriteGuard<'_, IndexMap<K, Entry<V>>>> {
        self.entries.write().ok()
    }

    /// Remove a specific key if it is still expired.
    fn remove_expired(&self, key: &K) {
        if let Some(mut entries) = self.write_lock() {
            if let Some(entry) = entries.get(key) {
                if entry.is_expired() {
                    entries.shift_remove(key);
                    self.stats.record_expiration();
                    self.stats.decrement_size();
                }
            }
        }
    }

    /// Evict the oldest entry by insertion order.
    fn evict_one(&self, entries: &mut IndexMap<K, Entry<V>>) {
        if let Some((key, _)) = entries.first() {
            let key = key.clone();
            entries.shift_remove(&key);
            self.stats.record_eviction();
            self.stats.decrement_size();
            tracing::trace!("evicted oldest entry to stay within capacity");
        }
    }
}
