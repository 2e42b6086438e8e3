//! Test-number auth provider
//!
//! Accepts only configured fictional numbers, each with a fixed code, and
//! never sends an SMS. Used in development and by the API tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use ds_core::domain::value_objects::{BotCheckToken, ChallengeHandle, VerifiedIdentity};
use ds_core::errors::{ConfirmError, ProviderError};
use ds_core::services::verification::AuthProvider;
use ds_shared::phone::{mask_phone_number, normalize_phone_number};

#[derive(Default)]
struct TestNumberState {
    challenges: HashMap<String, String>,
    known_users: HashSet<String>,
}

/// Provider backed by a fixed phone-to-code table
pub struct TestNumberAuthProvider {
    numbers: HashMap<String, String>,
    state: Mutex<TestNumberState>,
}

impl TestNumberAuthProvider {
    pub fn new(numbers: HashMap<String, String>) -> Self {
        let numbers = numbers
            .into_iter()
            .map(|(phone, code)| (normalize_phone_number(&phone), code))
            .collect();
        Self {
            numbers,
            state: Mutex::new(TestNumberState::default()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TestNumberState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AuthProvider for TestNumberAuthProvider {
    async fn issue_challenge(
        &self,
        phone_number: &str,
        bot_check: &BotCheckToken,
    ) -> Result<ChallengeHandle, ProviderError> {
        if bot_check.as_str().is_empty() {
            return Err(ProviderError::BotCheckFailed {
                reason: "missing bot check token".to_string(),
            });
        }

        let phone = normalize_phone_number(phone_number);
        if !self.numbers.contains_key(&phone) {
            return Err(ProviderError::InvalidPhoneNumber {
                phone: mask_phone_number(&phone),
            });
        }

        let session_info = format!("test-session-{}", Uuid::new_v4());
        self.lock_state()
            .challenges
            .insert(session_info.clone(), phone.clone());

        info!(
            phone = %mask_phone_number(&phone),
            event = "test_challenge_issued",
            "Issued challenge for test number"
        );
        Ok(ChallengeHandle::new(session_info))
    }

    async fn confirm_challenge(
        &self,
        challenge: &ChallengeHandle,
        code: &str,
    ) -> Result<VerifiedIdentity, ConfirmError> {
        let mut state = self.lock_state();
        let phone = state
            .challenges
            .get(challenge.as_str())
            .cloned()
            .ok_or(ConfirmError::InvalidCode)?;

        let expected = self.numbers.get(&phone).ok_or(ConfirmError::InvalidCode)?;
        if expected != code {
            debug!(phone = %mask_phone_number(&phone), "Test code mismatch");
            return Err(ConfirmError::InvalidCode);
        }

        state.challenges.remove(challenge.as_str());
        let is_new_user = state.known_users.insert(phone.clone());
        let user_id = format!("test-{}", phone.trim_start_matches('+'));

        Ok(VerifiedIdentity::new(user_id, phone, format!("test-id-token-{}", Uuid::new_v4()))
            .with_new_user(is_new_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TestNumberAuthProvider {
        let mut numbers = HashMap::new();
        numbers.insert("+91 98765 43210".to_string(), "123456".to_string());
        TestNumberAuthProvider::new(numbers)
    }

    #[tokio::test]
    async fn test_fixed_code_is_accepted() {
        let provider = provider();
        let token = BotCheckToken::new("test-bot-check-token");
        let challenge = provider.issue_challenge("+919876543210", &token).await.unwrap();

        assert_eq!(
            provider.confirm_challenge(&challenge, "000000").await.unwrap_err(),
            ConfirmError::InvalidCode
        );

        let identity = provider.confirm_challenge(&challenge, "123456").await.unwrap();
        assert_eq!(identity.user_id, "test-919876543210");
        assert!(identity.is_new_user);

        // The challenge is consumed
        assert!(provider.confirm_challenge(&challenge, "123456").await.is_err());
    }

    #[tokio::test]
    async fn test_returning_user_is_not_new() {
        let provider = provider();
        let token = BotCheckToken::new("t");
        for expected_new in [true, false] {
            let challenge = provider.issue_challenge("+919876543210", &token).await.unwrap();
            let identity = provider.confirm_challenge(&challenge, "123456").await.unwrap();
            assert_eq!(identity.is_new_user, expected_new);
        }
    }

    #[tokio::test]
    async fn test_unknown_number_rejected() {
        let provider = provider();
        let result = provider
            .issue_challenge("+14155552671", &BotCheckToken::new("t"))
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidPhoneNumber { .. })));
    }

    #[tokio::test]
    async fn test_missing_bot_check_token_rejected() {
        let provider = provider();
        let result = provider
            .issue_challenge("+919876543210", &BotCheckToken::new(""))
            .await;
        assert!(matches!(result, Err(ProviderError::BotCheckFailed { .. })));
    }
}
