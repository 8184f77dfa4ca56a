//! Per-key lock registry for single-flight coordination.
//!
//! The registry hands out one mutex per live key, creating it on first use
//! and removing it once the last holder-or-waiter is gone. Distinct keys are
//! fully independent; a slow critical section for one key never blocks
//! another. A single short-lived coordination lock guards the key map and
//! the reference counts, and is never held while a caller's critical
//! section runs.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One outstanding interest in a key's critical section.
///
/// Invariant: an entry exists in the registry if and only if its reference
/// count is at least 1.
struct LockEntry {
    mutex: Arc<AsyncMutex<()>>,
    refcount: usize,
}

/// A registry of mutexes addressable by key.
///
/// Cloning a `LockRegistry` creates a new handle to the same underlying
/// registry, so it can be shared freely across tasks and threads.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use single_flight_cache::LockRegistry;
///
/// let registry: LockRegistry<String> = LockRegistry::new();
///
/// let guard = registry.acquire("job:42".to_string()).await;
/// assert_eq!(registry.len(), 1);
///
/// drop(guard);
/// assert_eq!(registry.len(), 0);
/// # }
/// ```
pub struct LockRegistry<K> {
    entries: Arc<StdMutex<HashMap<K, LockEntry>>>,
}

impl<K> Clone for LockRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K> Default for LockRegistry<K> {
    fn default() -> Self {
        Self {
            entries: Arc::new(StdMutex::new(HashMap::new())),
        }
    }
}

impl<K> fmt::Debug for LockRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry").finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone> LockRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling task until the key's mutex is held, returning a
    /// guard that releases it (and the registry entry) on drop.
    ///
    /// Cancelling the returned future while waiting leaves no trace in the
    /// registry: the reference taken for the attempt is returned before the
    /// future resolves to an error or is dropped.
    pub async fn acquire(&self, key: K) -> KeyGuard<K> {
        let registration = self.register(key);
        let guard = registration.mutex.clone().lock_owned().await;
        KeyGuard {
            _guard: guard,
            registration,
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout`.
    ///
    /// Returns `None` on timeout. The caller never enters the critical
    /// section in that case, and the registry does not leak an entry for
    /// the failed attempt.
    pub async fn acquire_timeout(&self, key: K, timeout: Duration) -> Option<KeyGuard<K>> {
        let registration = self.register(key);
        match tokio::time::timeout(timeout, registration.mutex.clone().lock_owned()).await {
            Ok(guard) => Some(KeyGuard {
                _guard: guard,
                registration,
            }),
            // Dropping the registration here returns the reference count
            // taken for the attempt; the mutex was never acquired, so it
            // must not be released.
            Err(_) => None,
        }
    }

    /// Attempt to take the key's mutex without waiting.
    pub fn try_acquire(&self, key: K) -> Option<KeyGuard<K>> {
        let registration = self.register(key);
        match registration.mutex.clone().try_lock_owned() {
            Ok(guard) => Some(KeyGuard {
                _guard: guard,
                registration,
            }),
            Err(_) => None,
        }
    }

    /// Block the calling thread until the key's mutex is held.
    ///
    /// This is the thread-parallel counterpart of [`acquire`](Self::acquire)
    /// and shares the same per-key mutexes, so blocking and async callers
    /// for the same key serialize against each other.
    ///
    /// # Panics
    /// Panics if called from within an async runtime; use
    /// [`acquire`](Self::acquire) there instead.
    pub fn acquire_blocking(&self, key: K) -> KeyGuard<K> {
        let registration = self.register(key);
        let guard = registration.mutex.clone().blocking_lock_owned();
        KeyGuard {
            _guard: guard,
            registration,
        }
    }

    /// Number of keys with a live lock entry (held or waited on).
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether no key currently has a lock entry.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Look up or create the entry for `key` and take a reference on it.
    ///
    /// Creation and the count bump happen in one coordination-lock critical
    /// section, so exactly one entry can exist per live key.
    fn register(&self, key: K) -> Registration<K> {
        let mutex = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_insert_with(|| LockEntry {
                mutex: Arc::new(AsyncMutex::new(())),
                refcount: 0,
            });
            entry.refcount += 1;
            Arc::clone(&entry.mutex)
        };

        Registration {
            registry: self.clone(),
            key,
            mutex,
        }
    }

    /// Return one reference on `key`, removing the entry when it was the
    /// last. Decrement and removal are a single critical section so two
    /// callers can never both decide they are the last holder.
    fn unregister(&self, key: &K) {
        let mut entries = self.lock_entries();
        match entries.get_mut(key) {
            Some(entry) if entry.refcount > 1 => entry.refcount -= 1,
            Some(_) => {
                entries.remove(key);
            }
            None => {
                debug_assert!(false, "lock entry missing on release");
                tracing::error!("lock entry missing on release; refcount bookkeeping is corrupt");
            }
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<K, LockEntry>> {
        // The coordination lock is only held for map mutation and never
        // across a panic-prone callback, so a poisoned guard is still
        // structurally sound.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A reference on a key's lock entry, separate from holding its mutex.
///
/// Dropping this decrements the reference count whether or not acquisition
/// ever succeeded, which keeps the bookkeeping honest on timeout and
/// cancellation paths.
struct Registration<K: Hash + Eq + Clone> {
    registry: LockRegistry<K>,
    key: K,
    mutex: Arc<AsyncMutex<()>>,
}

impl<K: Hash + Eq + Clone> Drop for Registration<K> {
    fn drop(&mut self) {
        self.registry.unregister(&self.key);
    }
}

/// Scoped ownership of a key's critical section.
///
/// Releases the mutex and then the registry reference when dropped, on
/// every exit path.
pub struct KeyGuard<K: Hash + Eq + Clone> {
    // Field order matters: the mutex guard must drop before the
    // registration so the lock is released before the entry can be removed.
    _guard: OwnedMutexGuard<()>,
    registration: Registration<K>,
}

impl<K: Hash + Eq + Clone> KeyGuard<K> {
    /// The key this guard locks.
    pub fn key(&self) -> &K {
        &self.registration.key
    }
}

impl<K: Hash + Eq + Clone> fmt::Debug for KeyGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").finish_non_exhaustive()
    }
}
