#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! Cache storage and caching decisions for a transparent HTTP caching
//! reverse proxy.
//!
//! This crate holds everything the proxy decides with, independent of any
//! HTTP server framework:
//!
//! - [`CacheStore`], the contract every storage backend implements, with
//!   per-entry TTLs, wildcard invalidation and statistics
//! - [`MemoryStore`], [`DiskStore`] (on [`cacache`](https://github.com/zkat/cacache-rs))
//!   and `RedisStore` backends
//! - [`select_backend`], which builds a store by name and falls back to memory
//!   when a persistent backend cannot be initialized
//! - [`Directives`], the `Cache-Control` interpreter
//! - [`InvalidationPlanner`], which turns a mutating request into purge patterns
//!
//! The Tower service that ties these together lives in `proxy-cache-tower`.
//!
//! ## Basic Usage
//!
//! ```rust
//! use proxy_cache::{CacheEntry, CacheStore, KeyPattern, MemoryStore};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> proxy_cache::Result<()> {
//! let store = MemoryStore::new(Duration::from_secs(300));
//!
//! let entry = CacheEntry::new(200, vec![("content-type".into(), "text/plain".into())], b"hi".to_vec());
//! store.set("GET:http://origin/users/1", entry, None).await?;
//! store.set("GET:http://origin/users/2", CacheEntry::new(200, vec![], vec![]), None).await?;
//!
//! assert!(store.exists("GET:http://origin/users/1").await?);
//!
//! let removed = store.invalidate_pattern(&KeyPattern::new("GET:http://origin/users*")?).await?;
//! assert_eq!(removed.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Choosing a backend
//!
//! ```rust
//! use proxy_cache::{select_backend, BackendConfig, BackendKind};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), proxy_cache::ConfigurationError> {
//! let config = BackendConfig { backend: "memory".into(), ..Default::default() };
//! let selection = select_backend(&config).await?;
//! assert_eq!(selection.active, BackendKind::Memory);
//! assert!(!selection.fell_back());
//!
//! // A typo is a hard error rather than a silent fallback
//! let config = BackendConfig { backend: "postgres".into(), ..Default::default() };
//! assert!(select_backend(&config).await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `manager-cacache` (default): enable the disk backend, [`DiskStore`].
//! - `manager-redis` (disabled): enable the Redis backend, `RedisStore`.
//!
//! Selecting a backend whose feature is disabled is treated like any other
//! initialization failure: the selector falls back to [`MemoryStore`].
mod backend;
mod directives;
mod error;
mod invalidation;
mod managers;
mod pattern;

use std::{
    fmt,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

pub use backend::{
    select_backend, BackendConfig, BackendInfo, BackendKind, BackendSelection,
    DEFAULT_DISK_PATH, DEFAULT_REDIS_PREFIX, DEFAULT_REDIS_URL, DEFAULT_TTL,
};
pub use directives::{Directives, MUST_REVALIDATE, NO_CACHE, NO_STORE};
pub use error::{
    BackendUnavailable, BoxError, ConfigurationError, Result, StoreError,
};
pub use invalidation::{
    strip_query, InvalidationPlanner, DEFAULT_RESOURCE_ID_PATTERN,
};
pub use pattern::KeyPattern;

pub use managers::memory::MemoryStore;

#[cfg(feature = "manager-cacache")]
pub use managers::cacache::DiskStore;

#[cfg(feature = "manager-redis")]
pub use managers::redis::RedisStore;

/// `x-cache` header: the caching decision taken for the response
pub const XCACHE: &str = "x-cache";

/// The caching decision reported in the `x-cache` header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from cache without contacting the origin
    Hit,
    /// Fetched from the origin and stored
    Miss,
    /// Fetched from the origin and not stored
    Bypass,
    /// The origin confirmed the cached copy with `304 Not Modified`
    Revalidated,
    /// The origin forbade storage with `no-store`
    NoStore,
    /// The request method is never cached
    Uncacheable,
}

impl CacheStatus {
    /// The header value for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
            Self::Revalidated => "REVALIDATED",
            Self::NoStore => "NO-STORE",
            Self::Uncacheable => "UNCACHEABLE",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the cache key for a request: `METHOD:ABSOLUTE_URL`.
///
/// The method is uppercased, so `get` and `GET` share a key while `GET` and
/// `HEAD` never do.
pub fn cache_key(method: &str, absolute_url: &str) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), absolute_url)
}

/// A stored response.
///
/// Header names keep the case they were stored with; [`CacheEntry::header`]
/// looks them up case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheEntry {
    /// HTTP response status code
    pub status: u16,
    /// HTTP response headers in their original order
    pub headers: Vec<(String, String)>,
    /// HTTP response body
    pub body: Vec<u8>,
    /// When the entry stops being served. `None` never expires.
    ///
    /// Set by the store from the TTL passed to [`CacheStore::set`].
    pub expires_at: Option<SystemTime>,
}

impl CacheEntry {
    /// Create a new entry without an expiry.
    pub fn new(
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self { status, headers, body, expires_at: None }
    }

    /// Returns the first value of the named header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Cache-Control` directives the response was stored with.
    pub fn directives(&self) -> Directives {
        Directives::parse_opt(self.header("cache-control"))
    }

    /// Checks expiry against the given instant. An entry expiring exactly
    /// `now` is still fresh.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Checks expiry against the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Stamps the expiry for a TTL starting at `now`. A zero TTL expires as
    /// soon as the clock moves past `now`.
    pub fn expiring_in(mut self, ttl: Duration, now: SystemTime) -> Self {
        self.expires_at = now.checked_add(ttl);
        self
    }

    /// Like [`CacheEntry::expiring_in`], except that a zero TTL stores the
    /// entry without expiry. Used by the persistent backends.
    pub fn persisting_for(self, ttl: Duration, now: SystemTime) -> Self {
        if ttl.is_zero() {
            Self { expires_at: None, ..self }
        } else {
            self.expiring_in(ttl, now)
        }
    }

    /// Serializes the entry for persistent backends.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Deserializes an entry read back from `key`.
    ///
    /// Decoding failures are reported as [`StoreError::MalformedEntry`].
    pub fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|source| {
            StoreError::MalformedEntry { key: key.to_string(), source }
        })
    }
}

/// Aggregate statistics reported by a [`CacheStore`].
///
/// `total_keys` counts every stored entry including expired ones that have
/// not been reclaimed yet, `active_keys` only the unexpired ones. Backends add
/// their own fields to `details`; they are flattened when serialized.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CacheStats {
    /// Entries currently stored
    pub total_keys: usize,
    /// Entries that have not expired
    pub active_keys: usize,
    /// Backend specific fields
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl CacheStats {
    /// Adds a backend specific field.
    pub fn with_detail(
        mut self,
        name: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.details.insert(name.to_string(), value.into());
        self
    }
}

/// A trait providing storage, lookup, expiry and invalidation of cached
/// responses.
///
/// Every backend follows the same contract:
///
/// - an entry is expired when its `expires_at` is set and strictly earlier
///   than now; expiry is checked lazily on every read
/// - `get`, `exists` and `keys` never report expired entries, while `size`
///   still counts them until they are reclaimed
/// - each call is atomic on its own; callers get no multi-call transactions
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Returns true if an unexpired entry exists for `key`.
    ///
    /// In-memory backends must not delete expired entries here.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Returns the unexpired entry for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Stores or fully replaces the entry for `key`.
    ///
    /// `None` applies the store's default TTL. Persistent backends store an
    /// entry with a zero TTL without expiry; the in-memory store lets it
    /// expire immediately.
    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Removes one entry, returning whether it existed.
    async fn invalidate(&self, key: &str) -> Result<bool>;

    /// Removes every entry whose key matches, expired or not, and returns the
    /// removed keys.
    async fn invalidate_pattern(
        &self,
        pattern: &KeyPattern,
    ) -> Result<Vec<String>>;

    /// Keys of all unexpired entries.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Number of stored entries, including expired ones not yet reclaimed.
    async fn size(&self) -> Result<usize>;

    /// Removes every entry.
    async fn clear(&self) -> Result<()>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<CacheStats>;

    /// Physically removes expired entries, returning how many were reclaimed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Releases backend resources. Calling it more than once is harmless.
    async fn close(&self) -> Result<()>;

    /// The TTL applied when [`CacheStore::set`] is called without one.
    fn default_ttl(&self) -> Duration;
}
