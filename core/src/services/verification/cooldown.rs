//! Resend cooldown persistence and countdown

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::remaining_seconds;
use crate::errors::StorageError;

use super::traits::{Clock, KeyValueStore};

/// Cooldown expiry stored under a single key as epoch milliseconds
#[derive(Clone)]
pub struct CooldownStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl CooldownStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn load(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };

        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(Some)
            .ok_or_else(|| StorageError::CorruptValue {
                key: self.key.clone(),
            })
    }

    pub async fn persist(&self, expiry: DateTime<Utc>) -> Result<(), StorageError> {
        self.store
            .set(&self.key, &expiry.timestamp_millis().to_string())
            .await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key).await
    }

    /// Remove the key only while it still holds `expiry`
    pub async fn clear_if(&self, expiry: DateTime<Utc>) -> Result<bool, StorageError> {
        match self.load().await {
            Ok(Some(stored)) if stored.timestamp_millis() == expiry.timestamp_millis() => {
                self.clear().await?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(StorageError::CorruptValue { .. }) => {
                self.clear().await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}

/// Publishes remaining cooldown seconds once per tick
///
/// When the countdown reaches zero the durable expiry is removed and the
/// ticker stops.
pub struct Countdown {
    sender: watch::Sender<u64>,
    ticker: Mutex<Option<CancellationToken>>,
    tick: Duration,
    clock: Arc<dyn Clock>,
    store: CooldownStore,
}

impl Countdown {
    pub fn new(clock: Arc<dyn Clock>, store: CooldownStore, tick: Duration) -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender,
            ticker: Mutex::new(None),
            tick,
            clock,
            store,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Count down to `expiry`, replacing any running countdown
    pub fn start(&self, expiry: DateTime<Utc>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock_ticker().replace(token.clone()) {
            previous.cancel();
        }

        let remaining = remaining_seconds(expiry, self.clock.now());
        if remaining > 0 {
            self.sender.send_replace(remaining);
        }

        let sender = self.sender.clone();
        let clock = Arc::clone(&self.clock);
        let store = self.store.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let remaining = remaining_seconds(expiry, clock.now());
                if remaining == 0 {
                    if !token.is_cancelled() {
                        if let Err(e) = store.clear_if(expiry).await {
                            tracing::warn!(
                                key = %store.key(),
                                error = %e,
                                event = "cooldown_clear_failed",
                                "Failed to clear elapsed cooldown"
                            );
                        }
                    }
                    sender.send_replace(0);
                    token.cancel();
                    break;
                }
                sender.send_replace(remaining);
            }
        });
    }

    /// Stop ticking without touching the durable expiry
    pub fn stop(&self) {
        if let Some(token) = self.lock_ticker().take() {
            token.cancel();
        }
    }

    fn lock_ticker(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.ticker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
