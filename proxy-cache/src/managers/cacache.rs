use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{
    backend::DEFAULT_TTL, CacheEntry, CacheStats, CacheStore, KeyPattern,
    Result, StoreError,
};

use serde_json::json;
use tokio::io::AsyncWriteExt;

const EXPIRES_AT: &str = "expires_at";

/// Implements [`CacheStore`] with [`cacache`](https://github.com/zkat/cacache-rs) as the backend.
///
/// Each entry is one index record: the cache key, the serialized key and
/// [`CacheEntry`] as content, and its expiry (milliseconds since the Unix
/// epoch, or `null`) in the record metadata. Listing and statistics only read
/// the index, never the content.
///
/// The content embeds the key so no two keys ever share a content blob, which
/// lets removal delete the content along with the index record.
#[cfg_attr(docsrs, doc(cfg(feature = "manager-cacache")))]
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where the cache will be stored.
    pub path: PathBuf,
    default_ttl: Duration,
}

/// A live index record
#[derive(Debug)]
struct Record {
    size: usize,
    expires_at: Option<SystemTime>,
}

impl Record {
    fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

impl DiskStore {
    /// Opens (creating if needed) a disk store rooted at `path`.
    pub async fn new(
        path: impl Into<PathBuf>,
        default_ttl: Duration,
    ) -> Result<Self> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path, default_ttl })
    }

    /// Opens a disk store at `path` with the default TTL.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(path, DEFAULT_TTL).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        cacache::RemoveOpts::new()
            .remove_fully(true)
            .remove(&self.path, key)
            .await?;
        Ok(())
    }

    /// Reads every live index record, newest write per key. The index walk
    /// is blocking and runs on the blocking thread pool.
    async fn records(&self) -> Result<BTreeMap<String, Record>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_index(&path))
            .await
            .map_err(std::io::Error::from)?
    }
}

fn read_index(path: &Path) -> Result<BTreeMap<String, Record>> {
    let mut latest: BTreeMap<String, (u128, Record)> = BTreeMap::new();
    for metadata in cacache::list_sync(path) {
        let metadata = metadata?;
        let expires_at = metadata
            .metadata
            .get(EXPIRES_AT)
            .and_then(serde_json::Value::as_u64)
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms));
        let record = Record { size: metadata.size, expires_at };
        match latest.get(&metadata.key) {
            Some((time, _)) if *time > metadata.time => {}
            _ => {
                latest.insert(metadata.key, (metadata.time, record));
            }
        }
    }
    Ok(latest.into_iter().map(|(k, (_, r))| (k, r)).collect())
}

fn expiry_millis(expires_at: Option<SystemTime>) -> Option<u64> {
    expires_at
        .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[async_trait::async_trait]
impl CacheStore for DiskStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        match cacache::metadata(&self.path, key).await? {
            Some(metadata) => {
                let expired = metadata
                    .metadata
                    .get(EXPIRES_AT)
                    .and_then(serde_json::Value::as_u64)
                    .is_some_and(|ms| {
                        UNIX_EPOCH + Duration::from_millis(ms)
                            < SystemTime::now()
                    });
                Ok(!expired)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let bytes = match cacache::read(&self.path, key).await {
            Ok(bytes) => bytes,
            Err(cacache::Error::EntryNotFound(_, _)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (_, entry): (String, CacheEntry) = postcard::from_bytes(&bytes)
            .map_err(|source| StoreError::MalformedEntry {
                key: key.to_string(),
                source,
            })?;
        if entry.is_expired() {
            // Persistent medium, so reclaim the row while we are here
            if let Err(e) = self.remove(key).await {
                log::warn!("Failed to remove expired cache entry {key}: {e}");
            }
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let entry = entry.persisting_for(
            ttl.unwrap_or(self.default_ttl),
            SystemTime::now(),
        );
        let bytes = postcard::to_allocvec(&(key, &entry))?;
        let mut writer = cacache::WriteOpts::new()
            .metadata(json!({ "expires_at": expiry_millis(entry.expires_at) }))
            .open(&self.path, key)
            .await?;
        writer.write_all(&bytes).await?;
        writer.commit().await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        if cacache::metadata(&self.path, key).await?.is_none() {
            return Ok(false);
        }
        self.remove(key).await?;
        Ok(true)
    }

    async fn invalidate_pattern(
        &self,
        pattern: &KeyPattern,
    ) -> Result<Vec<String>> {
        let matched: Vec<String> = self
            .records().await?
            .into_keys()
            .filter(|key| pattern.matches(key))
            .collect();
        for key in &matched {
            self.remove(key).await?;
        }
        Ok(matched)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let now = SystemTime::now();
        Ok(self
            .records().await?
            .into_iter()
            .filter(|(_, record)| !record.is_expired_at(now))
            .map(|(key, _)| key)
            .collect())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.records().await?.len())
    }

    async fn clear(&self) -> Result<()> {
        cacache::clear(&self.path).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let now = SystemTime::now();
        let records = self.records().await?;
        let active =
            records.values().filter(|r| !r.is_expired_at(now)).count();
        let disk_bytes: usize = records.values().map(|r| r.size).sum();
        Ok(CacheStats {
            total_keys: records.len(),
            active_keys: active,
            ..Default::default()
        }
        .with_detail("backend", "disk")
        .with_detail("path", self.path.display().to_string())
        .with_detail("default_ttl_seconds", self.default_ttl.as_secs())
        .with_detail("disk_bytes", disk_bytes))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let mut purged = 0;
        for (key, record) in self.records().await? {
            if record.is_expired_at(now) {
                self.remove(&key).await?;
                purged += 1;
            }
        }
        Ok(purged)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
