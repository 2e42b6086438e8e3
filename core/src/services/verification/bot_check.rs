//! Ownership of the bot-check widget rendered for a flow

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::value_objects::{BotCheckToken, WidgetHandle};
use crate::errors::BotCheckError;

use super::traits::BotCheckWidget;

/// Holds at most one live widget for a container
///
/// A stale widget is always destroyed before a new one is created, and a
/// failed teardown never blocks the next render.
pub struct BotCheckSlot {
    widget: Arc<dyn BotCheckWidget>,
    container_id: String,
    handle: Mutex<Option<WidgetHandle>>,
}

impl BotCheckSlot {
    pub fn new(widget: Arc<dyn BotCheckWidget>, container_id: impl Into<String>) -> Self {
        Self {
            widget,
            container_id: container_id.into(),
            handle: Mutex::new(None),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub async fn is_ready(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Destroy any existing widget, then render a fresh one
    pub async fn reinitialize(&self) -> Result<(), BotCheckError> {
        let mut slot = self.handle.lock().await;
        if let Some(stale) = slot.take() {
            self.destroy_quietly(&stale).await;
        }

        let handle = self.widget.create(&self.container_id).await?;
        tracing::debug!(
            container = %self.container_id,
            event = "bot_check_rendered",
            "Rendered bot check widget"
        );
        *slot = Some(handle);
        Ok(())
    }

    /// Run the check, rendering a widget first if none is live
    pub async fn token(&self) -> Result<BotCheckToken, BotCheckError> {
        let mut slot = self.handle.lock().await;
        let handle = match slot.as_ref() {
            Some(handle) => handle.clone(),
            None => {
                let handle = self.widget.create(&self.container_id).await?;
                *slot = Some(handle.clone());
                handle
            }
        };
        self.widget.execute(&handle).await
    }

    /// Destroy the live widget, if any
    pub async fn teardown(&self) {
        let stale = self.handle.lock().await.take();
        if let Some(stale) = stale {
            self.destroy_quietly(&stale).await;
        }
    }

    async fn destroy_quietly(&self, handle: &WidgetHandle) {
        if let Err(e) = self.widget.destroy(handle).await {
            tracing::debug!(
                container = %self.container_id,
                error = %e,
                event = "bot_check_destroy_failed",
                "Ignoring bot check teardown failure"
            );
        }
    }
}
