//! Where a verified user is sent next.

use ds_shared::Role;
use serde::{Deserialize, Serialize};

/// Next screen after a successful phone verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostVerificationRoute {
    /// Driver picked a role before signing up
    CompleteDriverProfile,
    /// Vehicle owner picked a role before signing up
    CompleteOwnerProfile,
    /// No role recorded yet
    SelectRole,
}

impl PostVerificationRoute {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Driver) => PostVerificationRoute::CompleteDriverProfile,
            Some(Role::Owner) => PostVerificationRoute::CompleteOwnerProfile,
            None => PostVerificationRoute::SelectRole,
        }
    }

    /// Application path of the screen
    pub fn path(&self) -> &'static str {
        match self {
            PostVerificationRoute::CompleteDriverProfile => "/driver/complete-profile?verified=true",
            PostVerificationRoute::CompleteOwnerProfile => "/owner/complete-profile?verified=true",
            PostVerificationRoute::SelectRole => "/select-role",
        }
    }
}
