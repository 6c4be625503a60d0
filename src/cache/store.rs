//! Durable, versioned response store backing the offline fetch proxy.
//!
//! Entries live under `<root>/<version>/` and are keyed by request identity
//! (method + URL). Each entry is a JSON meta file (status, headers) next to
//! a raw body file; the meta file is written last, so a torn write reads as
//! a miss. Entries survive process restarts and are invalidated only by a
//! version bump.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::error::{AppError, AppResult};

/// Full capture of a response: enough to replay it to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    headers: Vec<(String, String)>,
}

pub struct CacheStore {
    root: PathBuf,
    version_dir: PathBuf,
    version: String,
}

impl CacheStore {
    /// Open (creating if needed) the store for one cache generation.
    pub async fn open(root: impl Into<PathBuf>, version: &str) -> AppResult<Self> {
        let root = root.into();
        let version_dir = root.join(version);
        fs::create_dir_all(&version_dir)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to create cache dir: {}", e)))?;
        Ok(CacheStore {
            root,
            version_dir,
            version: version.to_string(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn key(method: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b" ");
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.version_dir.join(format!("{}.meta.json", key))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.version_dir.join(format!("{}.body", key))
    }

    /// Look up a stored response by request identity. Any read or parse
    /// failure is treated as a miss.
    pub async fn get(&self, method: &str, url: &str) -> Option<CachedResponse> {
        let key = Self::key(method, url);
        let meta_bytes = match fs::read(self.meta_path(&key)).await {
            Ok(bytes) => bytes,
            Err(_) => {
                trace!(method, url, "Cache miss");
                return None;
            }
        };
        let meta: EntryMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(method, url, error = %e, "Unreadable cache meta, treating as miss");
                return None;
            }
        };
        match fs::read(self.body_path(&key)).await {
            Ok(body) => {
                trace!(method, url, "Cache hit");
                Some(CachedResponse {
                    status: meta.status,
                    headers: meta.headers,
                    body,
                })
            }
            Err(e) => {
                warn!(method, url, error = %e, "Cache body missing, treating as miss");
                None
            }
        }
    }

    /// Store a response capture, overwriting any prior entry for the key.
    pub async fn put(&self, method: &str, url: &str, response: &CachedResponse) -> AppResult<()> {
        let key = Self::key(method, url);
        fs::write(self.body_path(&key), &response.body)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to write cache body: {}", e)))?;
        let meta = EntryMeta {
            status: response.status,
            headers: response.headers.clone(),
        };
        let meta_bytes = serde_json::to_vec(&meta)?;
        fs::write(self.meta_path(&key), meta_bytes)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to write cache meta: {}", e)))?;
        debug!(method, url, size = response.body.len(), "Stored response");
        Ok(())
    }

    pub async fn contains(&self, method: &str, url: &str) -> bool {
        let key = Self::key(method, url);
        fs::try_exists(self.meta_path(&key)).await.unwrap_or(false)
    }

    /// Delete every generation directory under the root except the current
    /// one. Returns how many were removed.
    pub async fn remove_stale_versions(&self) -> AppResult<usize> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to read cache root: {}", e)))?;
        let mut removed = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to read cache root entry: {}", e)))?
        {
            let path = entry.path();
            if !path.is_dir() || path == self.version_dir {
                continue;
            }
            if let Err(e) = fs::remove_dir_all(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove stale cache generation");
            } else {
                debug!(path = %path.display(), "Removed stale cache generation");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir, version: &str) -> CacheStore {
        CacheStore::open(dir.path().to_path_buf(), version)
            .await
            .unwrap()
    }

    fn capture(status: u16, body: &[u8]) -> CachedResponse {
        CachedResponse {
            status,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "v1").await;
        let entry = capture(200, b"<html>hello</html>");

        store.put("GET", "http://app/index.html", &entry).await.unwrap();
        let hit = store.get("GET", "http://app/index.html").await.unwrap();
        assert_eq!(hit, entry);
    }

    #[tokio::test]
    async fn miss_on_unknown_request() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "v1").await;
        assert!(store.get("GET", "http://app/other").await.is_none());
    }

    #[tokio::test]
    async fn key_includes_method() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "v1").await;
        store
            .put("GET", "http://app/", &capture(200, b"get"))
            .await
            .unwrap();
        assert!(store.get("HEAD", "http://app/").await.is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "v1").await;
        store
            .put("GET", "http://app/", &capture(200, b"old"))
            .await
            .unwrap();
        store
            .put("GET", "http://app/", &capture(200, b"new"))
            .await
            .unwrap();
        assert_eq!(store.get("GET", "http://app/").await.unwrap().body, b"new");
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir, "v1").await;
            store
                .put("GET", "http://app/", &capture(200, b"durable"))
                .await
                .unwrap();
        }
        let store = open_store(&dir, "v1").await;
        assert_eq!(
            store.get("GET", "http://app/").await.unwrap().body,
            b"durable"
        );
    }

    #[tokio::test]
    async fn version_bump_starts_empty_and_cleanup_removes_old() {
        let dir = TempDir::new().unwrap();
        let v1 = open_store(&dir, "v1").await;
        v1.put("GET", "http://app/", &capture(200, b"v1 body"))
            .await
            .unwrap();

        let v2 = open_store(&dir, "v2").await;
        assert!(v2.get("GET", "http://app/").await.is_none());

        let removed = v2.remove_stale_versions().await.unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("v1").exists());
        assert!(dir.path().join("v2").exists());
    }
}
