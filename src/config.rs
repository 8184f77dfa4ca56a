//! Configuration for the memoizer.
//!
//! This module provides a builder pattern for configuring entry lifetime
//! and the bound on resident entries.

use std::time::Duration;

/// Configuration for creating a new [`Memoizer`](crate::Memoizer).
///
/// Use the builder pattern to construct configuration:
///
/// ```
/// use single_flight_cache::MemoizerConfig;
/// use std::time::Duration;
///
/// let config = MemoizerConfig::new()
///     .ttl(Duration::from_secs(300))
///     .capacity(10_000)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MemoizerConfig {
    /// How long a memoized result stays valid after it is stored.
    pub(crate) ttl: Duration,

    /// Maximum number of resident entries. When a write would exceed this,
    /// the oldest entry by insertion is evicted first.
    pub(crate) capacity: usize,
}

impl Default for MemoizerConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 100,
        }
    }
}

impl MemoizerConfig {
    /// Create a new configuration builder with default values
    /// (60 second TTL, 100 entries).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lifetime of memoized results.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of resident entries.
    ///
    /// A capacity of zero is treated as one; the cache always admits the
    /// result it just computed.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Get the configured TTL.
    pub fn get_ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the configured capacity.
    pub fn get_capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MemoizerConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.capacity, 100);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MemoizerConfig::new()
            .ttl(Duration::from_secs(5))
            .capacity(1000)
            .build();

        assert_eq!(config.get_ttl(), Duration::from_secs(5));
        assert_eq!(config.get_capacity(), 1000);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config = MemoizerConfig::new().capacity(0).build();
        assert_eq!(config.get_capacity(), 1);
    }
}
