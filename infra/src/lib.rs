//! # Infrastructure Layer
//!
//! Concrete adapters for the capabilities the DriveSync verification flow
//! depends on.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Provider**: Identity Toolkit REST client and a fixed test-number provider
//! - **Storage**: Memory, JSON file and Redis key-value stores
//! - **Bot check**: Registry of invisible bot-check widgets
//! - **Capture**: Origin-bound SMS inbox feeding automatic code capture
//!
//! ## Features
//!
//! - `redis-cache`: Enable the Redis key-value store (default)

use std::sync::Arc;

use ds_core::errors::StorageError;
use ds_core::services::verification::{AuthProvider, KeyValueStore};
use ds_shared::config::{ProviderConfig, ProviderKind, StorageBackend, StorageConfig};

pub mod bot_check;
pub mod capture;
pub mod provider;
pub mod storage;

pub use bot_check::InvisibleRecaptcha;
pub use capture::{extract_origin_bound_code, SmsInboxCapture};
pub use provider::{IdentityToolkitConfig, IdentityToolkitProvider, TestNumberAuthProvider};
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};

#[cfg(feature = "redis-cache")]
pub use storage::RedisKeyValueStore;

/// Create the auth provider selected by configuration
pub fn create_auth_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn AuthProvider>, InfrastructureError> {
    match config.kind {
        ProviderKind::IdentityToolkit => {
            let provider_config = IdentityToolkitConfig::from_provider_config(config)?;
            Ok(Arc::new(IdentityToolkitProvider::new(provider_config)?))
        }
        ProviderKind::TestNumbers => {
            if config.test_numbers.is_empty() {
                tracing::warn!(
                    event = "test_numbers_empty",
                    "Test-number provider configured without any numbers"
                );
            }
            Ok(Arc::new(TestNumberAuthProvider::new(config.test_numbers.clone())))
        }
    }
}

/// Create the durable key-value store selected by configuration
pub async fn create_key_value_store(
    config: &StorageConfig,
) -> Result<Arc<dyn KeyValueStore>, InfrastructureError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
        StorageBackend::File => Ok(Arc::new(FileKeyValueStore::open(&config.path).await?)),
        #[cfg(feature = "redis-cache")]
        StorageBackend::Redis => Ok(Arc::new(RedisKeyValueStore::connect(config).await?)),
        #[cfg(not(feature = "redis-cache"))]
        StorageBackend::Redis => Err(InfrastructureError::Config(
            "Redis storage requires the redis-cache feature".to_string(),
        )),
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for StorageError {
    fn from(error: InfrastructureError) -> Self {
        StorageError::backend(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_key_value_store(&StorageConfig::memory()).await.unwrap();
        store.set("language", "hi").await.unwrap();
        assert_eq!(store.get("language").await.unwrap().as_deref(), Some("hi"));
    }

    #[test]
    fn test_identity_toolkit_requires_api_key() {
        let result = create_auth_provider(&ProviderConfig::default());
        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }

    #[test]
    fn test_create_test_number_provider() {
        assert!(create_auth_provider(&ProviderConfig::test_numbers()).is_ok());
    }
}
