//! JSON file key-value store
//!
//! The whole map is kept in one JSON object on disk. Writes go to a sibling
//! temporary file that is then renamed over the original, so a crash never
//! leaves a half-written file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ds_core::errors::StorageError;
use ds_core::services::verification::KeyValueStore;

use crate::InfrastructureError;

/// Key-value store persisted to a local JSON file
pub struct FileKeyValueStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open the store, creating parent directories as needed
    ///
    /// An unreadable file is set aside and the store starts empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, InfrastructureError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    let backup = path.with_extension("corrupt");
                    warn!(
                        path = %path.display(),
                        error = %e,
                        event = "storage_file_corrupt",
                        "Storage file unreadable, starting empty"
                    );
                    tokio::fs::rename(&path, &backup).await?;
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = values.len(), "Opened storage file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_snapshot(&self, values: &BTreeMap<String, String>) -> Result<(), InfrastructureError> {
        let bytes = serde_json::to_vec_pretty(values)?;
        let temp = self.path.with_extension("tmp");
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.write_snapshot(&values).await {
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.write_snapshot(&values).await {
            values.insert(key.to_string(), previous);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("local_storage.json");

        let store = FileKeyValueStore::open(&path).await.unwrap();
        store.set("selectedRole", "driver").await.unwrap();
        store.set("otpCooldownEnd", "1709283660000").await.unwrap();
        store.remove("otpCooldownEnd").await.unwrap();
        drop(store);

        let reopened = FileKeyValueStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("selectedRole").await.unwrap().as_deref(),
            Some("driver")
        );
        assert!(reopened.get("otpCooldownEnd").await.unwrap().is_none());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_set_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local_storage.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileKeyValueStore::open(&path).await.unwrap();
        assert!(store.get("language").await.unwrap().is_none());
        assert!(path.with_extension("corrupt").exists());

        store.set("language", "or").await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"language\": \"or\""));
    }
}
