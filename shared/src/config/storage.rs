//! Durable key-value storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backend used for durable client state (cooldown expiry, selected role)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on restart
    Memory,
    /// JSON file on local disk
    #[default]
    File,
    /// Redis server
    Redis,
}

/// Durable storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the JSON file for the file backend
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix applied to every Redis key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_path(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl StorageConfig {
    /// In-memory storage for development and tests
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Default::default()
        }
    }

    /// Redis storage at the given URL
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Redis,
            redis_url: url.into(),
            ..Default::default()
        }
    }

    /// Generate a Redis key with prefix
    pub fn make_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("data/local_storage.json")
}

fn default_redis_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_key_prefix() -> String {
    String::from("drivesync")
}
