use std::{fmt, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use serde::Serialize;

use crate::{
    error::{BackendUnavailable, ConfigurationError},
    CacheStore, MemoryStore,
};

/// TTL applied when neither the caller nor the origin supplies one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default directory of the disk backend
pub const DEFAULT_DISK_PATH: &str = "./proxy-cache";

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default prefix put in front of every key stored in Redis
pub const DEFAULT_REDIS_PREFIX: &str = "proxy-cache:";

/// The storage backends the selector knows about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// [`MemoryStore`]
    Memory,
    /// `DiskStore`, on cacache
    Disk,
    /// `RedisStore`
    Redis,
}

impl BackendKind {
    /// The canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    /// Parses a backend identifier, ignoring case and surrounding whitespace.
    /// `file` and `cacache` are accepted as aliases of `disk`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "disk" | "file" | "cacache" => Ok(Self::Disk),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigurationError::UnknownBackend(s.to_string())),
        }
    }
}

/// Configuration consumed by [`select_backend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend identifier (`memory`, `disk` or `redis`)
    pub backend: String,
    /// Connection URL of the Redis backend
    pub redis_url: String,
    /// Prefix for keys stored in Redis
    pub redis_prefix: String,
    /// Directory of the disk backend
    pub disk_path: PathBuf,
    /// TTL applied to entries stored without one
    pub default_ttl: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory.as_str().to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            redis_prefix: DEFAULT_REDIS_PREFIX.to_string(),
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            default_ttl: DEFAULT_TTL,
        }
    }
}

/// The store chosen by [`select_backend`] and how it was chosen.
#[derive(Clone)]
pub struct BackendSelection {
    /// The ready-to-use store
    pub store: Arc<dyn CacheStore>,
    /// The backend named in the configuration
    pub requested: BackendKind,
    /// The backend actually in use
    pub active: BackendKind,
    /// Why the requested backend could not be used, when it was not
    pub fallback_reason: Option<String>,
}

impl fmt::Debug for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelection")
            .field("requested", &self.requested)
            .field("active", &self.active)
            .field("fallback_reason", &self.fallback_reason)
            .finish_non_exhaustive()
    }
}

impl BackendSelection {
    /// Returns true if the requested backend failed and memory is used instead.
    pub fn fell_back(&self) -> bool {
        self.fallback_reason.is_some()
    }

    /// A serializable summary, reported alongside cache statistics.
    pub fn info(&self) -> BackendInfo {
        BackendInfo {
            backend: self.active,
            requested_backend: self.requested,
            fallback: self.fell_back(),
            fallback_reason: self.fallback_reason.clone(),
        }
    }
}

/// Serializable description of the backend in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    /// The backend actually in use
    pub backend: BackendKind,
    /// The backend named in the configuration
    pub requested_backend: BackendKind,
    /// Whether the selector fell back to memory
    pub fallback: bool,
    /// Why it fell back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Builds the store named by `config.backend`.
///
/// An unknown identifier fails with [`ConfigurationError::UnknownBackend`].
/// A known persistent backend that cannot be initialized (unreachable server,
/// unusable directory, or support not compiled in) is replaced by a
/// [`MemoryStore`] with the same default TTL, and the reason is recorded in
/// the returned [`BackendSelection`].
pub async fn select_backend(
    config: &BackendConfig,
) -> Result<BackendSelection, ConfigurationError> {
    let requested: BackendKind = config.backend.parse()?;
    let selection = match init_backend(requested, config).await {
        Ok(store) => {
            log::info!("Using {requested} cache backend");
            BackendSelection {
                store,
                requested,
                active: requested,
                fallback_reason: None,
            }
        }
        Err(e) => {
            log::warn!("{e}; falling back to in-memory cache");
            BackendSelection {
                store: Arc::new(MemoryStore::new(config.default_ttl)),
                requested,
                active: BackendKind::Memory,
                fallback_reason: Some(e.reason),
            }
        }
    };
    Ok(selection)
}

async fn init_backend(
    kind: BackendKind,
    config: &BackendConfig,
) -> Result<Arc<dyn CacheStore>, BackendUnavailable> {
    match kind {
        BackendKind::Memory => {
            Ok(Arc::new(MemoryStore::new(config.default_ttl)))
        }
        BackendKind::Disk => init_disk(config).await,
        BackendKind::Redis => init_redis(config).await,
    }
}

#[cfg(feature = "manager-cacache")]
async fn init_disk(
    config: &BackendConfig,
) -> Result<Arc<dyn CacheStore>, BackendUnavailable> {
    let store = crate::DiskStore::new(&config.disk_path, config.default_ttl)
        .await
        .map_err(|e| BackendUnavailable {
            backend: BackendKind::Disk.as_str(),
            reason: format!("{}: {e}", config.disk_path.display()),
        })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "manager-cacache"))]
async fn init_disk(
    _config: &BackendConfig,
) -> Result<Arc<dyn CacheStore>, BackendUnavailable> {
    Err(BackendUnavailable {
        backend: BackendKind::Disk.as_str(),
        reason: "built without the manager-cacache feature".to_string(),
    })
}

#[cfg(feature = "manager-redis")]
async fn init_redis(
    config: &BackendConfig,
) -> Result<Arc<dyn CacheStore>, BackendUnavailable> {
    let store = crate::RedisStore::connect(
        &config.redis_url,
        config.redis_prefix.clone(),
        config.default_ttl,
    )
    .await
    .map_err(|e| BackendUnavailable {
        backend: BackendKind::Redis.as_str(),
        reason: e.to_string(),
    })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "manager-redis"))]
async fn init_redis(
    _config: &BackendConfig,
) -> Result<Arc<dyn CacheStore>, BackendUnavailable> {
    Err(BackendUnavailable {
        backend: BackendKind::Redis.as_str(),
        reason: "built without the manager-redis feature".to_string(),
    })
}
