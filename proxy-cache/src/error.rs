use std::fmt;

use thiserror::Error;

/// Generic error type for proxy and origin failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A `Result` typedef defaulting to [`StoreError`]
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors returned by [`CacheStore`](crate::CacheStore) implementations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// A stored entry could not be deserialized.
    #[error("Malformed cache entry for key {key:?}: {source}")]
    MalformedEntry {
        /// The key holding the unreadable entry
        key: String,
        /// The underlying decoding error
        source: postcard::Error,
    },
    /// The store was closed with [`CacheStore::close`](crate::CacheStore::close).
    #[error("Cache store is closed")]
    Closed,
    /// Filesystem error
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Entry serialization failed
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] postcard::Error),
    /// An invalidation pattern could not be compiled
    #[error("Invalid invalidation pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// Error from the disk backend
    #[cfg(feature = "manager-cacache")]
    #[error("Disk cache error: {0}")]
    Disk(#[from] cacache::Error),
    /// Error from the Redis backend
    #[cfg(feature = "manager-redis")]
    #[error("Redis cache error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    /// Returns true if this error means the stored data itself is unreadable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::MalformedEntry { .. })
    }
}

/// Error type for backend identifiers that do not name any known backend.
///
/// This is never recovered from: it indicates a typo in configuration rather
/// than an environment problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The requested backend identifier is not recognized
    #[error("Unknown cache backend {0:?} (expected one of: memory, disk, redis)")]
    UnknownBackend(String),
}

/// Error type for a persistent backend that could not be initialized.
///
/// The backend selector turns this into an in-memory fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUnavailable {
    /// The backend that failed
    pub backend: &'static str,
    /// Human readable failure reason
    pub reason: String,
}

impl fmt::Display for BackendUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} backend unavailable: {}", self.backend, self.reason)
    }
}

impl std::error::Error for BackendUnavailable {}
