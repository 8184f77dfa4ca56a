//! Error types for the memoization library.
//!
//! A fetch can fail in exactly two ways: the per-key lock was not obtained
//! within the caller's deadline, or the producer itself failed. Producer
//! failures propagate verbatim and are never cached.

use std::error::Error;
use std::fmt;

/// The error type for memoized fetches.
///
/// `E` is the wrapped producer's own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoizeError<E> {
    /// The per-key lock could not be obtained within the caller-specified
    /// timeout. Recoverable: retry, or fail the surrounding request.
    AcquireTimeout,

    /// The wrapped producer failed. The failure is propagated verbatim to
    /// the caller of the invocation that ran the producer; nothing is
    /// cached.
    Producer(E),
}

impl<E> MemoizeError<E> {
    /// Whether this is a lock-acquisition timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MemoizeError::AcquireTimeout)
    }

    /// Extract the producer's error, if that is what failed.
    pub fn into_producer(self) -> Option<E> {
        match self {
            MemoizeError::Producer(err) => Some(err),
            MemoizeError::AcquireTimeout => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for MemoizeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoizeError::AcquireTimeout => {
                write!(f, "timed out waiting for the per-key lock")
            }
            MemoizeError::Producer(err) => write!(f, "producer failed: {}", err),
        }
    }
}

impl<E: Error + 'static> Error for MemoizeError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MemoizeError::Producer(err) => Some(err),
            MemoizeError::AcquireTimeout => None,
        }
    }
}

/// A specialized Result type for memoized fetches.
pub type MemoizeResult<T, E> = Result<T, MemoizeError<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err: MemoizeError<io::Error> = MemoizeError::AcquireTimeout;
        assert_eq!(format!("{}", err), "timed out waiting for the per-key lock");

        let err = MemoizeError::Producer("upstream returned 503".to_string());
        assert_eq!(format!("{}", err), "producer failed: upstream returned 503");
    }

    #[test]
    fn test_source_delegates_to_producer() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err: MemoizeError<io::Error> = MemoizeError::Producer(io_err);
        assert!(err.source().is_some());

        let err: MemoizeError<io::Error> = MemoizeError::AcquireTimeout;
        assert!(err.source().is_none());
    }

    #[test]
    fn test_accessors() {
        let err: MemoizeError<&str> = MemoizeError::AcquireTimeout;
        assert!(err.is_timeout());
        assert_eq!(err.into_producer(), None);

        let err = MemoizeError::Producer("boom");
        assert!(!err.is_timeout());
        assert_eq!(err.into_producer(), Some("boom"));
    }
}
