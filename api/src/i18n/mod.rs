//! Localized user-facing messages
//!
//! The catalog lives in `i18n/messages.toml`. A copy next to the working
//! directory overrides the one embedded at compile time.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ds_shared::Language;

const CATALOG_PATH: &str = "i18n/messages.toml";

/// One message in every supported language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Translations {
    pub en: String,
    pub hi: String,
    pub or: String,
}

impl Translations {
    pub fn get(&self, lang: Language) -> &str {
        let text = match lang {
            Language::English => &self.en,
            Language::Hindi => &self.hi,
            Language::Odia => &self.or,
        };
        if text.is_empty() {
            &self.en
        } else {
            text
        }
    }
}

/// Error message with its wire code and HTTP status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub http_status: u16,
    #[serde(flatten)]
    pub text: Translations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageCatalog {
    #[serde(default)]
    pub errors: HashMap<String, ErrorMessage>,
    #[serde(default)]
    pub notices: HashMap<String, Translations>,
}

pub static MESSAGES: Lazy<MessageCatalog> = Lazy::new(|| {
    load_catalog().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load message catalog");
        MessageCatalog::default()
    })
});

fn load_catalog() -> Result<MessageCatalog, Box<dyn std::error::Error>> {
    let path = Path::new(CATALOG_PATH);
    if path.exists() {
        let content = fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }
    load_default_catalog()
}

/// Catalog embedded at compile time
pub fn load_default_catalog() -> Result<MessageCatalog, Box<dyn std::error::Error>> {
    let embedded = include_str!("../../i18n/messages.toml");
    Ok(toml::from_str(embedded)?)
}

/// Wire code, localized text and HTTP status of an error message
pub fn error_message(key: &str, lang: Language) -> Option<(String, String, u16)> {
    MESSAGES
        .errors
        .get(key)
        .map(|msg| (msg.code.clone(), msg.text.get(lang).to_string(), msg.http_status))
}

/// Localized notice; unknown keys come back unchanged
pub fn notice(key: &str, lang: Language) -> String {
    MESSAGES
        .notices
        .get(key)
        .map(|msg| msg.get(lang).to_string())
        .unwrap_or_else(|| key.to_string())
}

pub fn format_message(template: &str, params: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
