use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;

use crate::{
    backend::DEFAULT_TTL, CacheEntry, CacheStats, CacheStore, KeyPattern,
    Result,
};

/// Implements [`CacheStore`] in process memory with [`dashmap`](https://github.com/xacrimon/dashmap).
///
/// Expired entries stay in the map until they are overwritten, invalidated or
/// reclaimed by [`CacheStore::purge_expired`]; reads simply stop returning
/// them. A zero TTL, as sent with `max-age=0`, expires the entry as soon as
/// the clock moves on. Clones share the same underlying map.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryStore {
    /// Create an empty store with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: Arc::new(DashMap::new()), default_ttl }
    }

    fn active_count(&self, now: SystemTime) -> usize {
        self.entries.iter().filter(|e| !e.value().is_expired_at(now)).count()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let now = SystemTime::now();
        Ok(self.entries.get(key).is_some_and(|e| !e.is_expired_at(now)))
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let now = SystemTime::now();
        Ok(self
            .entries
            .get(key)
            .filter(|e| !e.is_expired_at(now))
            .map(|e| e.value().clone()))
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let entry = entry.expiring_in(
            ttl.unwrap_or(self.default_ttl),
            SystemTime::now(),
        );
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn invalidate_pattern(
        &self,
        pattern: &KeyPattern,
    ) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        self.entries.retain(|key, _| {
            if pattern.matches(key) {
                removed.push(key.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let now = SystemTime::now();
        Ok(self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired_at(now))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let now = SystemTime::now();
        let body_bytes: usize =
            self.entries.iter().map(|e| e.value().body.len()).sum();
        Ok(CacheStats {
            total_keys: self.entries.len(),
            active_keys: self.active_count(now),
            ..Default::default()
        }
        .with_detail("backend", "memory")
        .with_detail("default_ttl_seconds", self.default_ttl.as_secs())
        .with_detail("body_bytes", body_bytes))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
