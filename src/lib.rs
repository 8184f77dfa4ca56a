//! # Single-Flight Cache
//!
//! A thread-safe memoization library for Rust: expensive computations are
//! cached for a bounded time, keyed by their arguments, and concurrent
//! callers for the same key collapse into a single in-flight computation.
//!
//! ## Features
//!
//! - **Single-flight**: one producer invocation per key per cache-miss
//!   episode, no matter how many callers race
//! - **TTL expiry**: results live for a configurable duration
//! - **Bounded**: oldest-by-insertion eviction keeps the cache at capacity
//! - **Sync and async**: the same memoizer serves thread-based and
//!   task-based callers with identical guarantees
//! - **Statistics**: track hits, misses, producer invocations, evictions
//! - **Zero unsafe code**: built entirely with safe Rust
//!
//! ## Quick Start
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use single_flight_cache::{Memoizer, MemoizerConfig};
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! let config = MemoizerConfig::new()
//!     .ttl(Duration::from_secs(300))
//!     .capacity(1_000)
//!     .build();
//! let memoizer: Memoizer<String, String> = Memoizer::new(config);
//!
//! // First fetch runs the producer and caches the result.
//! let bio = memoizer
//!     .fetch("user:123".to_string(), || async {
//!         // ... some expensive lookup ...
//!         Ok::<_, Infallible>("Alice".to_string())
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(bio, "Alice");
//!
//! // Later fetches within the TTL are served from cache.
//! let stats = memoizer.stats();
//! println!("hit rate: {:.1}%", stats.hit_rate);
//! # }
//! ```
//!
//! ## Single-flight
//!
//! When several callers miss on the same key at once, exactly one of them
//! runs the producer; the rest wait on that key's lock and then find the
//! freshly stored result. Callers for *different* keys never wait on each
//! other. Per-call context arguments that should not split the cache (a
//! session handle, a request scope) can be wrapped in [`Transient`] so
//! they are ignored for key identity.
//!
//! ## Thread Safety
//!
//! The memoizer is safe to share across threads and tasks. Cloning a
//! [`Memoizer`] creates a new handle to the same underlying cache:
//!
//! ```rust
//! use single_flight_cache::{Memoizer, MemoizerConfig};
//! use std::convert::Infallible;
//! use std::thread;
//!
//! let memoizer: Memoizer<u32, u32> = Memoizer::new(MemoizerConfig::default());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let memoizer = memoizer.clone();
//!         thread::spawn(move || {
//!             memoizer
//!                 .fetch_blocking(7, || Ok::<_, Infallible>(7 * 7))
//!                 .unwrap()
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), 49);
//! }
//! // However many threads raced, the producer ran at most once.
//! assert_eq!(memoizer.stats().populations, 1);
//! ```

// Public API - stable in v1.0.0
pub mod config;
pub mod error;
pub mod key;
pub mod memoizer;
pub mod registry;
pub mod stats;

pub use config::MemoizerConfig;
pub use error::{MemoizeError, MemoizeResult};
pub use key::Transient;
pub use memoizer::{Memoized, Memoizer};
pub use registry::{KeyGuard, LockRegistry};
pub use stats::{MemoStats, StatsSnapshot};

// Internal modules - not part of public API
pub(crate) mod entry;
pub(crate) mod store;
