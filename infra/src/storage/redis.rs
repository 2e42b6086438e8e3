//! Redis key-value store
//!
//! Uses a multiplexed async connection with retry and exponential backoff
//! for transient failures. Every key is namespaced with the configured
//! prefix.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use ds_core::errors::StorageError;
use ds_core::services::verification::KeyValueStore;
use ds_shared::config::StorageConfig;

use crate::InfrastructureError;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Key-value store backed by Redis
#[derive(Clone)]
pub struct RedisKeyValueStore {
    connection: MultiplexedConnection,
    config: StorageConfig,
}

impl RedisKeyValueStore {
    /// Connect, retrying transient failures
    pub async fn connect(config: &StorageConfig) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.redis_url), "Connecting to Redis");

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let mut attempts = 0;
        let mut delay = RETRY_DELAY_MS;
        let connection = loop {
            attempts += 1;
            match client.get_multiplexed_async_connection().await {
                Ok(connection) => break connection,
                Err(e) if attempts < MAX_RETRIES => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, MAX_RETRIES, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => return Err(InfrastructureError::Cache(e)),
            }
        };

        info!("Connected to Redis");
        Ok(Self {
            connection,
            config: config.clone(),
        })
    }

    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = RETRY_DELAY_MS;

        loop {
            attempts += 1;
            match operation(self.connection.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < MAX_RETRIES && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, MAX_RETRIES, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn storage_error(key: &str, error: RedisError) -> StorageError {
    error!(key = %key, error = %error, event = "redis_operation_failed", "Redis operation failed");
    StorageError::backend(error.to_string())
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = self.config.make_key(key);
        debug!("Getting key '{}'", key);
        let lookup = key.clone();
        self.execute_with_retry(move |mut conn| {
            let key = lookup.clone();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
        .map_err(|e| storage_error(&key, e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = self.config.make_key(key);
        let (target, value) = (key.clone(), value.to_string());
        self.execute_with_retry(move |mut conn| {
            let (key, value) = (target.clone(), value.clone());
            Box::pin(async move { conn.set::<_, _, ()>(key, value).await })
        })
        .await
        .map_err(|e| storage_error(&key, e))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = self.config.make_key(key);
        let target = key.clone();
        self.execute_with_retry(move |mut conn| {
            let key = target.clone();
            Box::pin(async move { conn.del::<_, u32>(key).await })
        })
        .await
        .map(|_| ())
        .map_err(|e| storage_error(&key, e))
    }
}

fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Hide credentials in a Redis URL
fn mask_url(url: &str) -> String {
    match (url.find("://"), url.find('@')) {
        (Some(proto_end), Some(at_pos)) if at_pos > proto_end => {
            format!("{}****{}", &url[..proto_end + 3], &url[at_pos..])
        }
        _ => url.to_string(),
    }
}
