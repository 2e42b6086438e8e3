//! Configuration for the verification flow

use std::time::Duration as StdDuration;

use chrono::Duration;
use ds_shared::VerificationConfig;

use crate::domain::entities::verification_session::{CODE_LENGTH, DEFAULT_RESEND_COOLDOWN_SECONDS};

/// Configuration for one verification flow instance
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Minimum wait between two dispatches
    pub resend_cooldown: Duration,
    /// Number of characters in a code
    pub code_length: usize,
    /// Countdown resolution
    pub countdown_tick: StdDuration,
    /// Durable key holding the cooldown expiry
    pub cooldown_key: String,
    /// Container the bot-check widget renders into
    pub bot_check_container: String,
    /// Let an explicit submit retry an identical, already-rejected code
    pub allow_identical_resubmit: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::from(&VerificationConfig::default())
    }
}

impl From<&VerificationConfig> for FlowConfig {
    fn from(config: &VerificationConfig) -> Self {
        let cooldown_seconds = if config.resend_cooldown_seconds >= 0 {
            config.resend_cooldown_seconds
        } else {
            DEFAULT_RESEND_COOLDOWN_SECONDS
        };
        Self {
            resend_cooldown: Duration::seconds(cooldown_seconds),
            code_length: if config.code_length == 0 {
                CODE_LENGTH
            } else {
                config.code_length
            },
            countdown_tick: StdDuration::from_millis(config.countdown_tick_millis.max(10)),
            cooldown_key: config.cooldown_storage_key.clone(),
            bot_check_container: config.bot_check_container.clone(),
            allow_identical_resubmit: config.allow_identical_resubmit,
        }
    }
}

impl FlowConfig {
    /// Namespace the durable key and widget container to one client session
    pub fn scoped(mut self, scope: &str) -> Self {
        self.cooldown_key = VerificationConfig::scoped_key(&self.cooldown_key, scope);
        self.bot_check_container = VerificationConfig::scoped_key(&self.bot_check_container, scope);
        self
    }

    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    pub fn with_identical_resubmit(mut self, allow: bool) -> Self {
        self.allow_identical_resubmit = allow;
        self
    }
}
