//! On-disk [`KeyValueStore`]: one JSON file per key under a root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::KeyValueStore;
use crate::{Error, Result};

// ---

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        // ---
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::storage(root.display().to_string(), e))?;

        tracing::debug!("File storage opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9_-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        // ---
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // ---
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(key, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        // ---
        // Temp file then rename; readers never see a partial value. Each
        // write gets its own temp name so concurrent writers never share one.
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::now_v7().simple()));

        fs::write(&tmp, value)
            .await
            .map_err(|e| Error::storage(key, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::storage(key, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        // ---
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        storage
            .set("@tapaburaco_ratings", "[]".to_string())
            .await
            .unwrap();

        let reopened = FileStorage::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("@tapaburaco_ratings").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_absent_key_and_idempotent_remove() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).await.unwrap();

        assert_eq!(storage.get("missing").await.unwrap(), None);
        storage.remove("missing").await.unwrap();

        storage.set("k", "v".to_string()).await.unwrap();
        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_to_one_key() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let a = FileStorage::open(dir.path()).await.unwrap();
        let b = FileStorage::open(dir.path()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                storage.set("@tapaburaco_incidents", format!("[{i}]")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let last = a.get("@tapaburaco_incidents").await.unwrap().unwrap();
        assert!((0..16).any(|i| last == format!("[{i}]")));

        // Only the key file remains; no temp files left behind
        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, ["_tapaburaco_incidents.json"]);
    }

    #[test]
    fn test_path_for_sanitizes_key() {
        // ---
        let storage = FileStorage {
            root: PathBuf::from("/data"),
        };
        assert_eq!(
            storage.path_for("@tapaburaco_user_stats_admin-001"),
            PathBuf::from("/data/_tapaburaco_user_stats_admin-001.json")
        );
    }
}
