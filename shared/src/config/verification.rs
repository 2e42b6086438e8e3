//! Phone verification flow configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the phone verification flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// Seconds a client must wait before requesting another challenge
    #[serde(default = "default_resend_cooldown_seconds")]
    pub resend_cooldown_seconds: i64,

    /// Number of characters in a one-time code
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Resolution of the cooldown countdown in milliseconds
    #[serde(default = "default_countdown_tick_millis")]
    pub countdown_tick_millis: u64,

    /// Durable key holding the cooldown expiry (epoch milliseconds)
    #[serde(default = "default_cooldown_storage_key")]
    pub cooldown_storage_key: String,

    /// Durable key holding the role picked before sign-up
    #[serde(default = "default_role_storage_key")]
    pub role_storage_key: String,

    /// Durable key holding the preferred language
    #[serde(default = "default_language_storage_key")]
    pub language_storage_key: String,

    /// Container the invisible bot-check widget is rendered into
    #[serde(default = "default_bot_check_container")]
    pub bot_check_container: String,

    /// Prefix pre-filled into the phone input
    #[serde(default = "default_phone_prefix")]
    pub default_phone_prefix: String,

    /// Domain origin-bound SMS codes must be addressed to (`@domain #123456`)
    #[serde(default = "default_origin_domain")]
    pub origin_domain: String,

    /// Let an explicit submit retry a code that was already rejected
    #[serde(default)]
    pub allow_identical_resubmit: bool,

    /// Seconds without a request after which a session is discarded
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,

    /// How often idle sessions are looked for
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            resend_cooldown_seconds: default_resend_cooldown_seconds(),
            code_length: default_code_length(),
            countdown_tick_millis: default_countdown_tick_millis(),
            cooldown_storage_key: default_cooldown_storage_key(),
            role_storage_key: default_role_storage_key(),
            language_storage_key: default_language_storage_key(),
            bot_check_container: default_bot_check_container(),
            default_phone_prefix: default_phone_prefix(),
            origin_domain: default_origin_domain(),
            allow_identical_resubmit: false,
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
        }
    }
}

impl VerificationConfig {
    /// Override the resend cooldown
    pub fn with_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.resend_cooldown_seconds = seconds.max(0);
        self
    }

    /// Override the origin domain used for automatic code capture
    pub fn with_origin_domain(mut self, domain: impl Into<String>) -> Self {
        self.origin_domain = domain.into();
        self
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    /// Derive a storage key scoped to one client session
    pub fn scoped_key(base: &str, scope: &str) -> String {
        format!("{}:{}", base, scope)
    }
}

fn default_resend_cooldown_seconds() -> i64 {
    60
}

fn default_code_length() -> usize {
    6
}

fn default_countdown_tick_millis() -> u64 {
    1000
}

fn default_cooldown_storage_key() -> String {
    String::from("otpCooldownEnd")
}

fn default_role_storage_key() -> String {
    String::from("selectedRole")
}

fn default_language_storage_key() -> String {
    String::from("language")
}

fn default_bot_check_container() -> String {
    String::from("recaptcha-container-signup")
}

fn default_phone_prefix() -> String {
    String::from("+91 ")
}

fn default_origin_domain() -> String {
    String::from("drivesync-757cf.firebaseapp.com")
}

fn default_session_idle_timeout_secs() -> u64 {
    900
}

fn default_session_sweep_interval_secs() -> u64 {
    60
}
