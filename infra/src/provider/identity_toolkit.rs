//! Identity Toolkit phone authentication
//!
//! This module talks to the Identity Toolkit REST API:
//!
//! - `accounts:sendVerificationCode` issues a challenge and returns the
//!   session info used as the challenge handle
//! - `accounts:signInWithPhoneNumber` checks a code against that session
//!
//! Phone numbers are normalized to E.164 before they leave the process,
//! assuming the configured region when no country code was typed.

use std::time::Duration;

use async_trait::async_trait;
use phonenumber::{country, Mode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ds_core::domain::value_objects::{BotCheckToken, ChallengeHandle, VerifiedIdentity};
use ds_core::errors::{ConfirmError, ProviderError};
use ds_core::services::verification::AuthProvider;
use ds_shared::config::ProviderConfig;
use ds_shared::phone::mask_phone_number;

use crate::InfrastructureError;

/// Identity Toolkit client configuration
#[derive(Debug, Clone)]
pub struct IdentityToolkitConfig {
    /// Web API key of the project
    pub api_key: String,
    /// REST API base URL
    pub base_url: String,
    /// Timeout for a single request
    pub request_timeout: Duration,
    /// Region assumed for numbers without a country code
    pub default_region: country::Id,
}

impl IdentityToolkitConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self, InfrastructureError> {
        if !config.has_api_key() {
            return Err(InfrastructureError::Config(
                "provider.api_key is required for the identity-toolkit provider".to_string(),
            ));
        }

        let default_region = config
            .default_region
            .trim()
            .to_uppercase()
            .parse::<country::Id>()
            .map_err(|_| {
                InfrastructureError::Config(format!(
                    "Unknown default region: {}",
                    config.default_region
                ))
            })?;

        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            default_region,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeRequest<'a> {
    phone_number: &'a str,
    recaptcha_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPhoneNumberRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPhoneNumberResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    local_id: String,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity Toolkit implementation of [`AuthProvider`]
pub struct IdentityToolkitProvider {
    client: reqwest::Client,
    config: IdentityToolkitConfig,
}

impl IdentityToolkitProvider {
    pub fn new(config: IdentityToolkitConfig) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!(
            base_url = %config.base_url,
            region = ?config.default_region,
            "Identity Toolkit provider initialized"
        );

        Ok(Self { client, config })
    }

    /// Normalize a typed phone number to E.164
    pub fn normalize_phone_number(&self, phone: &str) -> Result<String, ProviderError> {
        let invalid = || ProviderError::InvalidPhoneNumber {
            phone: mask_phone_number(phone),
        };

        let parsed = phonenumber::parse(Some(self.config.default_region), phone.trim())
            .map_err(|_| invalid())?;
        if !phonenumber::is_valid(&parsed) {
            return Err(invalid());
        }
        Ok(parsed.format().mode(Mode::E164).to_string())
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.config.base_url, method, self.config.api_key
        )
    }

    /// POST a JSON body; a non-success status yields the provider's error code
    async fn post<B, R>(&self, method: &str, body: &B) -> Result<R, CallError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| CallError::Transport(format!("invalid response body: {}", e)));
        }

        let code = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => error_code(&envelope.error.message),
            Err(_) => format!("HTTP_{}", status.as_u16()),
        };
        Err(CallError::Api {
            status: status.as_u16(),
            code,
        })
    }
}

/// Failure of a single REST call
#[derive(Debug)]
enum CallError {
    Transport(String),
    Api { status: u16, code: String },
}

/// Error code from messages such as `INVALID_CODE : The code is invalid`
fn error_code(message: &str) -> String {
    message
        .split(|c: char| c == ':' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn classify_dispatch_error(error: CallError) -> ProviderError {
    match error {
        CallError::Transport(message) => ProviderError::Unavailable { message },
        CallError::Api { status, code } => match code.as_str() {
            "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => ProviderError::InvalidPhoneNumber {
                phone: String::from("****"),
            },
            "QUOTA_EXCEEDED" | "TOO_MANY_ATTEMPTS_TRY_LATER" => ProviderError::QuotaExceeded,
            "CAPTCHA_CHECK_FAILED" | "MISSING_RECAPTCHA_TOKEN" | "INVALID_RECAPTCHA_TOKEN" => {
                ProviderError::BotCheckFailed { reason: code }
            }
            _ if status >= 500 => ProviderError::Unavailable { message: code },
            _ => ProviderError::Rejected { code },
        },
    }
}

fn classify_confirm_error(error: CallError) -> ConfirmError {
    match error {
        CallError::Api { ref code, .. }
            if matches!(
                code.as_str(),
                "INVALID_CODE" | "SESSION_EXPIRED" | "INVALID_SESSION_INFO" | "CODE_EXPIRED"
            ) =>
        {
            ConfirmError::InvalidCode
        }
        other => ConfirmError::Provider(classify_dispatch_error(other)),
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitProvider {
    async fn issue_challenge(
        &self,
        phone_number: &str,
        bot_check: &BotCheckToken,
    ) -> Result<ChallengeHandle, ProviderError> {
        let phone_number = self.normalize_phone_number(phone_number)?;
        debug!(
            phone = %mask_phone_number(&phone_number),
            "Requesting verification code"
        );

        let request = SendVerificationCodeRequest {
            phone_number: &phone_number,
            recaptcha_token: bot_check.as_str(),
        };

        match self
            .post::<_, SendVerificationCodeResponse>("sendVerificationCode", &request)
            .await
        {
            Ok(response) => Ok(ChallengeHandle::new(response.session_info)),
            Err(e) => {
                error!(
                    phone = %mask_phone_number(&phone_number),
                    error = ?e,
                    event = "provider_dispatch_failed",
                    "Identity Toolkit rejected verification code request"
                );
                Err(classify_dispatch_error(e))
            }
        }
    }

    async fn confirm_challenge(
        &self,
        challenge: &ChallengeHandle,
        code: &str,
    ) -> Result<VerifiedIdentity, ConfirmError> {
        let request = SignInWithPhoneNumberRequest {
            session_info: challenge.as_str(),
            code,
        };

        match self
            .post::<_, SignInWithPhoneNumberResponse>("signInWithPhoneNumber", &request)
            .await
        {
            Ok(response) => {
                let mut identity = VerifiedIdentity::new(
                    response.local_id,
                    response.phone_number.unwrap_or_default(),
                    response.id_token,
                )
                .with_new_user(response.is_new_user);
                if let Some(refresh_token) = response.refresh_token {
                    identity = identity.with_refresh_token(refresh_token);
                }
                Ok(identity)
            }
            Err(e) => {
                warn!(
                    error = ?e,
                    event = "provider_confirm_failed",
                    "Identity Toolkit rejected verification code"
                );
                Err(classify_confirm_error(e))
            }
        }
    }
}
