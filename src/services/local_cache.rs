//! Keyed local cache with per-user namespacing.
//!
//! Keys can only be built through [`CacheKey::scoped`], so every record is
//! filed under exactly one user and never read back under another.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::models::user::UserId;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);
impl CacheKey {
    pub fn scoped(user_id: UserId, namespace: &str) -> Self {
        CacheKey(format!("user:{}:{}", user_id, namespace))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>>;
    async fn set(&self, key: &CacheKey, value: String) -> CacheResult<()>;
    async fn remove(&self, key: &CacheKey) -> CacheResult<()>;
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn LocalCache, key: &CacheKey) -> CacheResult<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(cache: &dyn LocalCache, key: &CacheKey, value: &T) -> CacheResult<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, raw).await
}

/// Session-only cache. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}
impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key.as_str()).cloned())
    }

    async fn set(&self, key: &CacheKey, value: String) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.as_str().to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key.as_str());
        Ok(())
    }
}

/// Cache persisted as one JSON document; rewritten on every change so it
/// survives a reload.
#[derive(Debug)]
pub struct FileCache {
    file_path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileCache {
    pub async fn open<P: AsRef<Path>>(file_path: P) -> CacheResult<Self> {
        let cache = Self {
            file_path: file_path.as_ref().to_path_buf(),
            entries: RwLock::new(HashMap::new()),
        };
        cache.load().await?;

        Ok(cache)
    }

    async fn load(&self) -> CacheResult<()> {
        let raw = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Cache file {} does not exist, starting empty", self.file_path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let loaded: HashMap<String, String> = if raw.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&raw)?
        };

        let mut entries = self.entries.write().await;
        *entries = loaded;

        tracing::info!("Loaded {} cache entries from {}", entries.len(), self.file_path.display());
        Ok(())
    }

    async fn save(&self, entries: &HashMap<String, String>) -> CacheResult<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let raw = serde_json::to_vec(entries)?;
        let tmp_path = self.file_path.with_extension("tmp");
        tokio::fs::write(&tmp_path, raw).await?;
        tokio::fs::rename(&tmp_path, &self.file_path).await?;

        tracing::debug!("Saved {} cache entries", entries.len());
        Ok(())
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key.as_str()).cloned())
    }

    async fn set(&self, key: &CacheKey, value: String) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.as_str().to_string(), value);
        self.save(&entries).await
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key.as_str()).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn uid(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_scoped_key_format() {
        let key = CacheKey::scoped(uid(42), "referral_attempts");
        assert_eq!(key.as_str(), "user:42:referral_attempts");
        assert_ne!(key, CacheKey::scoped(uid(43), "referral_attempts"));
    }

    #[tokio::test]
    async fn test_memory_cache_is_namespaced_per_user() {
        let cache = MemoryCache::new();
        let alice = CacheKey::scoped(uid(1), "notes");
        let bob = CacheKey::scoped(uid(2), "notes");

        cache.set(&alice, "hello".to_string()).await.unwrap();

        assert_eq!(cache.get(&alice).await.unwrap().as_deref(), Some("hello"));
        assert!(cache.get(&bob).await.unwrap().is_none());

        cache.remove(&alice).await.unwrap();
        assert!(cache.get(&alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MemoryCache::new();
        let key = CacheKey::scoped(uid(7), "codes");

        set_json(&cache, &key, &vec!["A".to_string(), "B".to_string()]).await.unwrap();
        let codes: Vec<String> = get_json(&cache, &key).await.unwrap().unwrap();

        assert_eq!(codes, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_file_cache_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let key = CacheKey::scoped(uid(5), "processed_start_params");

        let cache = FileCache::open(&path).await.unwrap();
        cache.set(&key, "[\"DIVINE000001AAAA\"]".to_string()).await.unwrap();

        let reopened = FileCache::open(&path).await.unwrap();
        assert_eq!(
            reopened.get(&key).await.unwrap().as_deref(),
            Some("[\"DIVINE000001AAAA\"]")
        );

        reopened.remove(&key).await.unwrap();
        let reopened_again = FileCache::open(&path).await.unwrap();
        assert!(reopened_again.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_cache_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(FileCache::open(&path).await, Err(CacheError::Serde(_))));
    }
}
