//! Capabilities the verification flow depends on
//!
//! Each collaborator is injected as a trait object so the flow runs the same
//! against real adapters and in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::domain::value_objects::{BotCheckToken, ChallengeHandle, VerifiedIdentity, WidgetHandle};
use crate::errors::{BotCheckError, ConfirmError, ProviderError, StorageError};

/// Identity provider that sends and checks phone challenges
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Send a one-time code to the phone number
    async fn issue_challenge(
        &self,
        phone_number: &str,
        bot_check: &BotCheckToken,
    ) -> Result<ChallengeHandle, ProviderError>;

    /// Check a code against an outstanding challenge
    async fn confirm_challenge(
        &self,
        challenge: &ChallengeHandle,
        code: &str,
    ) -> Result<VerifiedIdentity, ConfirmError>;
}

/// Invisible bot-check widget bound to a container
#[async_trait]
pub trait BotCheckWidget: Send + Sync {
    /// Render a widget into the container
    async fn create(&self, container_id: &str) -> Result<WidgetHandle, BotCheckError>;
    /// Run the check and obtain a token
    async fn execute(&self, widget: &WidgetHandle) -> Result<BotCheckToken, BotCheckError>;
    /// Remove the widget from its container
    async fn destroy(&self, widget: &WidgetHandle) -> Result<(), BotCheckError>;
}

/// Platform facility that reads an incoming code without user input
#[async_trait]
pub trait CodeCapture: Send + Sync {
    /// Wait for the next code addressed to this origin
    ///
    /// Resolves to `None` when the facility gives up or `cancel` fires.
    async fn request_code(&self, cancel: CancellationToken) -> Option<String>;
}

/// String key-value storage that survives a reload
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Wall clock
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Decides whether automatic code capture may be attempted
pub trait CapabilityProbe: Send + Sync {
    fn supports_auto_capture(&self) -> bool;
}

/// Capabilities reported by the client platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Mobile-class device
    pub mobile: bool,
    /// The platform exposes a code capture facility
    pub capture_facility: bool,
    /// Running in a secure context
    pub secure_context: bool,
}

impl PlatformCapabilities {
    /// Platform where every prerequisite is met
    pub fn full() -> Self {
        Self {
            mobile: true,
            capture_facility: true,
            secure_context: true,
        }
    }
}

impl CapabilityProbe for PlatformCapabilities {
    fn supports_auto_capture(&self) -> bool {
        self.mobile && self.capture_facility && self.secure_context
    }
}
