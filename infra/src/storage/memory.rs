//! In-process key-value store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ds_core::errors::StorageError;
use ds_core::services::verification::KeyValueStore;

/// Key-value store held in memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert!(store.get("otpCooldownEnd").await.unwrap().is_none());

        store.set("otpCooldownEnd", "1709283660000").await.unwrap();
        assert_eq!(
            store.get("otpCooldownEnd").await.unwrap().as_deref(),
            Some("1709283660000")
        );

        store.remove("otpCooldownEnd").await.unwrap();
        assert!(store.is_empty().await);

        // Removing a missing key is not an error
        store.remove("otpCooldownEnd").await.unwrap();
    }
}
