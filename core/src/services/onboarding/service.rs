//! Role persistence and post-verification routing

use std::sync::Arc;

use ds_shared::Role;

use crate::domain::value_objects::PostVerificationRoute;
use crate::errors::StorageError;
use crate::services::verification::KeyValueStore;

/// Routes a verified user based on the role they picked
pub struct OnboardingRouter {
    store: Arc<dyn KeyValueStore>,
    role_key: String,
}

impl OnboardingRouter {
    pub fn new(store: Arc<dyn KeyValueStore>, role_key: impl Into<String>) -> Self {
        Self {
            store,
            role_key: role_key.into(),
        }
    }

    /// Remember the role for the next verification
    pub async fn select_role(&self, role: Role) -> Result<(), StorageError> {
        self.store.set(&self.role_key, role.as_str()).await?;
        tracing::debug!(role = %role, event = "role_selected", "Stored selected role");
        Ok(())
    }

    /// Stored role, ignoring values that are not a known role
    pub async fn selected_role(&self) -> Result<Option<Role>, StorageError> {
        let Some(raw) = self.store.get(&self.role_key).await? else {
            return Ok(None);
        };
        match raw.parse::<Role>() {
            Ok(role) => Ok(Some(role)),
            Err(_) => {
                tracing::warn!(
                    key = %self.role_key,
                    value = %raw,
                    event = "unknown_role_ignored",
                    "Ignoring unknown stored role"
                );
                Ok(None)
            }
        }
    }

    /// Where to go after verification succeeds
    pub async fn next_route(&self) -> Result<PostVerificationRoute, StorageError> {
        Ok(PostVerificationRoute::for_role(self.selected_role().await?))
    }
}
