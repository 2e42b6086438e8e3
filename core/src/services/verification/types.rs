//! Types returned by the verification flow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{SkipReason, VerificationStatus};
use crate::domain::value_objects::VerifiedIdentity;

/// Result of a successful challenge dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Phone number the code was sent to
    pub phone_number: String,
    /// When another code may be requested
    pub resend_available_at: DateTime<Utc>,
    /// Seconds until another code may be requested
    pub cooldown_seconds: u64,
    /// Whether automatic code capture is listening
    pub auto_capture: bool,
}

/// Result of a confirmation request
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// The code was accepted
    Verified(VerifiedIdentity),
    /// The request never reached the provider
    Skipped(SkipReason),
}

impl ConfirmOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, ConfirmOutcome::Verified(_))
    }

    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        match self {
            ConfirmOutcome::Verified(identity) => Some(identity),
            ConfirmOutcome::Skipped(_) => None,
        }
    }
}

/// Where a code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOrigin {
    /// Explicit submit action
    Submit,
    /// Input field reached full length
    Input,
    /// Platform auto-capture
    AutoCapture,
}

impl CodeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeOrigin::Submit => "submit",
            CodeOrigin::Input => "input",
            CodeOrigin::AutoCapture => "auto-capture",
        }
    }
}

/// Point-in-time view of a flow for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: VerificationStatus,
    /// Masked phone number of the last dispatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub has_challenge: bool,
    pub code_input: String,
    pub cooldown_remaining: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_expiry: Option<DateTime<Utc>>,
    pub auto_capture_active: bool,
    pub rejected_attempts: u32,
    pub created_at: DateTime<Utc>,
}
