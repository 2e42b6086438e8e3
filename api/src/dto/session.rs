use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use ds_core::domain::value_objects::VerifiedIdentity;
use ds_core::services::verification::{ConfirmOutcome, DispatchOutcome, SessionSnapshot};
use ds_shared::phone::mask_phone_number;
use ds_shared::Role;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// Identifier of a session being restored after a reload
    #[serde(default)]
    pub session_id: Option<Uuid>,

    /// The client exposes an OTP credential facility
    #[serde(default)]
    pub otp_credential: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendCodeRequest {
    /// Phone number as typed; presence is checked by the flow
    #[validate(length(max = 32))]
    pub phone: String,

    /// Token from the invisible bot check solved in the browser
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub recaptcha_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(max = 16))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CodeInputRequest {
    #[validate(length(max = 64))]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InboundSmsRequest {
    #[validate(length(min = 1, max = 1024))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    /// Container the invisible bot check must be rendered into
    pub bot_check_container: String,
    /// Public site key of the bot check
    pub site_key: String,
    pub auto_capture_supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeResponse {
    /// Masked phone number the code was sent to
    pub phone_number: String,
    /// Seconds until another code may be requested
    pub resend_after: u64,
    pub resend_available_at: DateTime<Utc>,
    pub auto_capture: bool,
}

impl From<DispatchOutcome> for SendCodeResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            phone_number: mask_phone_number(&outcome.phone_number),
            resend_after: outcome.cooldown_seconds,
            resend_available_at: outcome.resend_available_at,
            auto_capture: outcome.auto_capture,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub verified: bool,

    /// Why the code was not sent to the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<VerifiedIdentity>,

    /// Page the client should navigate to next
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl VerifyCodeResponse {
    pub fn from_outcome(outcome: ConfirmOutcome, redirect_to: Option<String>) -> Self {
        match outcome {
            ConfirmOutcome::Verified(identity) => Self {
                verified: true,
                skipped: None,
                identity: Some(identity),
                redirect_to,
            },
            ConfirmOutcome::Skipped(reason) => Self {
                verified: false,
                skipped: Some(reason.as_str().to_string()),
                identity: None,
                redirect_to: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundSmsResponse {
    /// The message carried a code addressed to this origin
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
    pub redirect_to: String,
}
