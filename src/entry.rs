//! A memoized result with its expiry deadline.

use std::time::Instant;

/// A single cached result.
///
/// An entry is logically present only while the current time is before its
/// expiry; an expired entry reads as absent even if it has not been evicted
/// yet.
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    /// The stored value.
    value: V,

    /// Absolute point in time after which the value is stale.
    expires_at: Instant,
}

impl<V> Entry<V> {
    /// Create an entry that expires at `expires_at`.
    pub(crate) fn new(value: V, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    /// Check if this entry has expired.
    pub(crate) fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Check if this entry has expired at a given time.
    /// This is useful for sweeping many entries against one clock read.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Get a reference to the value.
    pub(crate) fn value(&self) -> &V {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_entry_with_future_expiry() {
        let future = Instant::now() + Duration::from_secs(60);
        let entry = Entry::new("test", future);
        assert!(!entry.is_expired());
        assert_eq!(*entry.value(), "test");
    }

    #[test]
    fn test_entry_with_past_expiry() {
        let past = Instant::now() - Duration::from_secs(1);
        let entry = Entry::new("test", past);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiry_against_supplied_clock() {
        let now = Instant::now();
        let entry = Entry::new(1u32, now + Duration::from_secs(10));

        assert!(!entry.is_expired_at(now + Duration::from_secs(9)));
        assert!(entry.is_expired_at(now + Duration::from_secs(10)));
        assert!(entry.is_expired_at(now + Duration::from_secs(11)));
    }
}
