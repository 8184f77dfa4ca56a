//! Key derivation support.
//!
//! A cache key is whatever hashable, value-equal composite of the
//! producer's arguments the caller builds, typically a tuple. Per-call
//! arguments that must not participate in key identity (a session handle,
//! a request context) are wrapped in [`Transient`], which hashes to nothing
//! and compares equal to any other `Transient` of the same type.

use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

/// Excludes a value from cache-key identity.
///
/// Two keys that differ only in a `Transient` payload hash identically and
/// compare equal, so otherwise-identical calls share one cache entry and
/// one in-flight computation regardless of the wrapped value.
///
/// The wrapped value stays accessible through `Deref`, so a producer can
/// still use it to do its work.
///
/// # Example
/// ```
/// use single_flight_cache::Transient;
/// use std::collections::HashMap;
///
/// let mut results = HashMap::new();
/// results.insert(("find me", Transient(1)), "cached");
///
/// // A different transient payload still finds the same entry.
/// assert!(results.contains_key(&("find me", Transient(2))));
/// ```
#[derive(Clone, Copy, Default)]
pub struct Transient<T>(pub T);

impl<T> Transient<T> {
    /// Wrap a value so it no longer contributes to key identity.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Hash for Transient<T> {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl<T> PartialEq for Transient<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Transient<T> {}

impl<T> Deref for Transient<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Transient<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Transient<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

// Deliberately does not expose the payload: transient values are often
// session-like objects that should not end up in logs.
impl<T> std::fmt::Debug for Transient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Transient")
    }
}
