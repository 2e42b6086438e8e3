//! Invisible bot-check widget registry
//!
//! The browser solves the invisible challenge and posts the resulting token
//! for its container; `execute` hands that token to the flow exactly once.
//! Only one widget may be rendered into a container at a time.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use ds_core::domain::value_objects::{BotCheckToken, WidgetHandle};
use ds_core::errors::BotCheckError;
use ds_core::services::verification::BotCheckWidget;
use ds_shared::config::BotCheckConfig;

#[derive(Default)]
struct Registry {
    next_id: u64,
    /// widget id -> container
    widgets: HashMap<String, String>,
    /// container -> token posted by the browser
    tokens: HashMap<String, String>,
}

impl Registry {
    fn holds(&self, container_id: &str) -> bool {
        self.widgets.values().any(|c| c == container_id)
    }
}

/// Registry of invisible bot-check widgets keyed by container
pub struct InvisibleRecaptcha {
    site_key: String,
    testing_token: Option<String>,
    registry: Mutex<Registry>,
}

impl InvisibleRecaptcha {
    pub fn new(config: &BotCheckConfig) -> Self {
        Self {
            site_key: config.site_key.clone(),
            testing_token: config.testing_token.clone(),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    /// Record the token the browser obtained for a container
    pub fn submit_token(&self, container_id: &str, token: impl Into<String>) {
        self.lock()
            .tokens
            .insert(container_id.to_string(), token.into());
    }

    /// Whether a live widget occupies the container
    pub fn is_rendered(&self, container_id: &str) -> bool {
        self.lock().holds(container_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BotCheckWidget for InvisibleRecaptcha {
    async fn create(&self, container_id: &str) -> Result<WidgetHandle, BotCheckError> {
        let mut registry = self.lock();
        if registry.holds(container_id) {
            return Err(BotCheckError::AlreadyRendered {
                container: container_id.to_string(),
            });
        }

        registry.next_id += 1;
        let id = format!("widget-{}", registry.next_id);
        registry.widgets.insert(id.clone(), container_id.to_string());
        debug!(container = %container_id, widget = %id, "Bot check widget rendered");
        Ok(WidgetHandle::new(id))
    }

    async fn execute(&self, widget: &WidgetHandle) -> Result<BotCheckToken, BotCheckError> {
        let mut registry = self.lock();
        let container = registry
            .widgets
            .get(widget.as_str())
            .cloned()
            .ok_or(BotCheckError::WidgetNotFound)?;

        if let Some(token) = registry.tokens.remove(&container) {
            return Ok(BotCheckToken::new(token));
        }
        match &self.testing_token {
            Some(token) => Ok(BotCheckToken::new(token.clone())),
            None => Err(BotCheckError::TokenUnavailable {
                reason: format!("no token submitted for {}", container),
            }),
        }
    }

    async fn destroy(&self, widget: &WidgetHandle) -> Result<(), BotCheckError> {
        let mut registry = self.lock();
        let container = registry
            .widgets
            .remove(widget.as_str())
            .ok_or(BotCheckError::WidgetNotFound)?;
        registry.tokens.remove(&container);
        Ok(())
    }
}
