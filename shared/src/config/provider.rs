//! Authentication provider and bot-check configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which authentication provider backs phone verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Identity Toolkit REST API (phone challenge + sign-in)
    #[default]
    IdentityToolkit,
    /// Fictional numbers with fixed codes, no network
    TestNumbers,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity-toolkit" | "identitytoolkit" | "firebase" => Ok(ProviderKind::IdentityToolkit),
            "test-numbers" | "test" | "mock" => Ok(ProviderKind::TestNumbers),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Authentication provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider implementation
    #[serde(default)]
    pub kind: ProviderKind,

    /// Web API key of the provider project
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the provider REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single provider request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Region assumed for numbers entered without a country code
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Fictional phone numbers mapped to their fixed codes
    #[serde(default)]
    pub test_numbers: HashMap<String, String>,

    /// Invisible bot-check settings
    #[serde(default)]
    pub bot_check: BotCheckConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            default_region: default_region(),
            test_numbers: HashMap::new(),
            bot_check: BotCheckConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Development provider with a single fictional number
    pub fn test_numbers() -> Self {
        let mut test_numbers = HashMap::new();
        test_numbers.insert("+919876543210".to_string(), "123456".to_string());
        Self {
            kind: ProviderKind::TestNumbers,
            test_numbers,
            bot_check: BotCheckConfig::testing(),
            ..Default::default()
        }
    }

    /// Add a fictional number with its fixed code
    pub fn with_test_number(mut self, phone: impl Into<String>, code: impl Into<String>) -> Self {
        self.test_numbers.insert(phone.into(), code.into());
        self
    }

    /// Check whether an API key has been configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Invisible bot-check widget configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BotCheckConfig {
    /// Public site key rendered into the widget
    #[serde(default)]
    pub site_key: String,

    /// Fixed token used when verification is disabled for testing
    #[serde(default)]
    pub testing_token: Option<String>,
}

impl BotCheckConfig {
    /// Configuration that bypasses the interactive check
    pub fn testing() -> Self {
        Self {
            site_key: String::new(),
            testing_token: Some(String::from("test-bot-check-token")),
        }
    }
}

fn default_base_url() -> String {
    String::from("https://identitytoolkit.googleapis.com/v1")
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_region() -> String {
    String::from("IN")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("firebase".parse::<ProviderKind>().unwrap(), ProviderKind::IdentityToolkit);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::TestNumbers);
        assert!("carrier-pigeon".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_test_numbers_config() {
        let config = ProviderConfig::test_numbers().with_test_number("+15555550100", "654321");
        assert_eq!(config.kind, ProviderKind::TestNumbers);
        assert_eq!(config.test_numbers.get("+919876543210").map(String::as_str), Some("123456"));
        assert_eq!(config.test_numbers.len(), 2);
        assert!(config.bot_check.testing_token.is_some());
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let value = serde_json::to_value(ProviderKind::IdentityToolkit).unwrap();
        assert_eq!(value, "identity-toolkit");
    }
}
