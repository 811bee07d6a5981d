//! Key/value store for enriched pull requests, so a rerun skips the detail requests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Cache entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

/// Raw string storage by key. Implementations must tolerate concurrent calls, including for one key.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, contents: String) -> Result<(), CacheError>;
}

/// Key under which a pull request's snapshot is stored.
pub fn cache_key(number: u64) -> String {
    format!("pr{number}")
}

/// Read and decode an entry.
pub async fn read_entry<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        None => Ok(None),
    }
}

/// Encode and store an entry.
pub async fn write_entry<T: Serialize + Sync>(cache: &dyn Cache, key: &str, value: &T) -> Result<(), CacheError> {
    let contents = serde_json::to_string(value)?;
    cache.set(key, contents).await
}

/// One `<key>.json` file per entry inside a directory.
#[derive(Debug, Clone)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl Cache for FsCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, contents: String) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;

        // Write then rename so readers never see a half-written entry.
        // Each call gets its own temporary file, so concurrent writes of one key cannot collide.
        let path = self.path(key);
        let unique = NEXT_TMP.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{key}.json.{}.{unique}.tmp", std::process::id()));
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "wrote cache entry");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        number: u64,
        author: String,
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(42), "pr42");
    }

    #[tokio::test]
    async fn test_missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path().join("never-created"));
        assert!(cache.get("pr1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path().join("octo").join("widgets"));

        cache.set("pr7", "{\"number\":7}".to_string()).await.unwrap();
        assert_eq!(cache.get("pr7").await.unwrap().as_deref(), Some("{\"number\":7}"));
        assert!(cache.dir().join("pr7.json").exists());
        assert_eq!(std::fs::read_dir(cache.dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path());

        cache.set("pr1", "old".to_string()).await.unwrap();
        cache.set("pr1", "new".to_string()).await.unwrap();
        assert_eq!(cache.get("pr1").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sets_of_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = std::sync::Arc::new(FsCache::new(dir.path()));

        for round in 0..50 {
            let first = tokio::spawn({
                let cache = cache.clone();
                async move { cache.set("pr1", format!("first {round}")).await }
            });
            let second = tokio::spawn({
                let cache = cache.clone();
                async move { cache.set("pr1", format!("second {round}")).await }
            });
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let stored = cache.get("pr1").await.unwrap().unwrap();
            assert!(stored.ends_with(&format!(" {round}")));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_typed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path());
        let entry = Entry {
            number: 3,
            author: "alice".to_string(),
        };

        write_entry(&cache, "pr3", &entry).await.unwrap();
        let restored: Option<Entry> = read_entry(&cache, "pr3").await.unwrap();
        assert_eq!(restored, Some(entry));

        let missing: Option<Entry> = read_entry(&cache, "pr4").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path());
        cache.set("pr5", "{ not json".to_string()).await.unwrap();

        let result: Result<Option<Entry>, _> = read_entry(&cache, "pr5").await;
        assert!(matches!(result, Err(CacheError::Json(_))));
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(dir.path());
        std::fs::create_dir(dir.path().join("pr6.json")).unwrap();

        assert!(matches!(cache.get("pr6").await, Err(CacheError::Io(_))));
    }
}
