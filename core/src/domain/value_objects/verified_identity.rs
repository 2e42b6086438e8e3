//! Identity returned by the provider after a successful confirmation.

use serde::{Deserialize, Serialize};

/// Verified identity of the person who completed a phone challenge
///
/// Contains:
/// - The provider's user identifier
/// - The verified phone number
/// - Provider tokens for the signed-in session
/// - Whether the provider created the account on this sign-in
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedIdentity {
    /// Provider user identifier
    pub user_id: String,

    /// Phone number in E.164 format
    pub phone_number: String,

    /// Provider ID token for the signed-in session
    pub id_token: String,

    /// Provider refresh token, when one is issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Whether this sign-in created the account
    #[serde(default)]
    pub is_new_user: bool,
}

impl VerifiedIdentity {
    pub fn new(
        user_id: impl Into<String>,
        phone_number: impl Into<String>,
        id_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            phone_number: phone_number.into(),
            id_token: id_token.into(),
            refresh_token: None,
            is_new_user: false,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_new_user(mut self, is_new_user: bool) -> Self {
        self.is_new_user = is_new_user;
        self
    }
}

impl std::fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("user_id", &self.user_id)
            .field("phone_number", &ds_shared::phone::mask_phone_number(&self.phone_number))
            .field("is_new_user", &self.is_new_user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let identity = VerifiedIdentity::new("uid-1", "+919876543210", "id-token")
            .with_refresh_token("refresh")
            .with_new_user(true);

        assert_eq!(identity.refresh_token.as_deref(), Some("refresh"));
        assert!(identity.is_new_user);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let identity = VerifiedIdentity::new("uid-1", "+919876543210", "secret-id-token");
        let printed = format!("{:?}", identity);
        assert!(!printed.contains("secret-id-token"));
        assert!(!printed.contains("9876543210"));
    }
}
