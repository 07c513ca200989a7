use std::{
    fmt, io,
    time::{Duration, SystemTime},
};

use redis::{aio::ConnectionManager, AsyncCommands};
use tokio::sync::RwLock;

use crate::{CacheEntry, CacheStats, CacheStore, KeyPattern, Result, StoreError};

/// How long [`RedisStore::connect`] waits for the server before giving up.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const SCAN_COUNT: usize = 100;

/// Implements [`CacheStore`] with [`redis`](https://github.com/redis-rs/redis-rs) as the backend.
///
/// Entries are stored as serialized [`CacheEntry`] values under
/// `{prefix}{cache key}` and expire natively through `PSETEX`, so `size`
/// never counts expired entries and [`CacheStore::purge_expired`] has
/// nothing to do.
#[cfg_attr(docsrs, doc(cfg(feature = "manager-redis")))]
pub struct RedisStore {
    conn: RwLock<Option<ConnectionManager>>,
    prefix: String,
    default_ttl: Duration,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the server at `url` and checks it answers `PING`.
    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        default_ttl: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, async {
            // One plain attempt first; the manager retries a refused
            // connection until the timeout runs out
            let mut plain = client.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut plain).await?;
            client.get_connection_manager().await
        })
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out connecting to {url}"),
            )
        })??;
        Ok(Self {
            conn: RwLock::new(Some(conn)),
            prefix: prefix.into(),
            default_ttl,
        })
    }

    async fn conn(&self) -> Result<ConnectionManager> {
        self.conn.read().await.clone().ok_or(StoreError::Closed)
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// SCANs for keys under the prefix starting with `literal`, returning
    /// them with the prefix removed.
    async fn scan(&self, literal: &str) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let glob = format!("{}{}*", escape_glob(&self.prefix), escape_glob(literal));
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&glob)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            found.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string)),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn delete_all(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let redis_keys: Vec<String> =
            keys.iter().map(|k| self.redis_key(k)).collect();
        let _: usize = conn.del(redis_keys).await?;
        Ok(())
    }
}

/// Escapes Redis glob metacharacters.
pub(crate) fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait::async_trait]
impl CacheStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let exists: bool = conn.exists(self.redis_key(key)).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut conn = self.conn().await?;
        let bytes: Option<Vec<u8>> = conn.get(self.redis_key(key)).await?;
        match bytes {
            Some(bytes) => Ok(Some(CacheEntry::from_bytes(key, &bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = entry.persisting_for(ttl, SystemTime::now());
        let bytes = entry.to_bytes()?;
        let mut conn = self.conn().await?;
        if ttl.is_zero() {
            let _: () = conn.set(self.redis_key(key), bytes).await?;
        } else {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            let _: () =
                conn.pset_ex(self.redis_key(key), bytes, millis).await?;
        }
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let removed: usize = conn.del(self.redis_key(key)).await?;
        Ok(removed > 0)
    }

    async fn invalidate_pattern(
        &self,
        pattern: &KeyPattern,
    ) -> Result<Vec<String>> {
        let matched: Vec<String> = self
            .scan(pattern.literal_prefix())
            .await?
            .into_iter()
            .filter(|key| pattern.matches(key))
            .collect();
        self.delete_all(&matched).await?;
        Ok(matched)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.scan("").await
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.scan("").await?.len())
    }

    async fn clear(&self) -> Result<()> {
        let keys = self.scan("").await?;
        self.delete_all(&keys).await
    }

    async fn stats(&self) -> Result<CacheStats> {
        let total = self.size().await?;
        let mut conn = self.conn().await?;
        let info: String =
            redis::cmd("INFO").arg("server").query_async(&mut conn).await?;
        let version = info
            .lines()
            .find_map(|line| line.strip_prefix("redis_version:"))
            .map(|v| v.trim().to_string());
        let mut stats = CacheStats {
            total_keys: total,
            active_keys: total,
            ..Default::default()
        }
        .with_detail("backend", "redis")
        .with_detail("prefix", self.prefix.clone())
        .with_detail("default_ttl_seconds", self.default_ttl.as_secs());
        if let Some(version) = version {
            stats = stats.with_detail("redis_version", version);
        }
        Ok(stats)
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }

    async fn close(&self) -> Result<()> {
        self.conn.write().await.take();
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
