//! Verification session entity tracking one phone-number verification attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ChallengeHandle;
use crate::errors::VerificationError;

/// Length of the one-time code delivered by SMS
pub const CODE_LENGTH: usize = 6;

/// Default minimum wait between two challenge dispatches (seconds)
pub const DEFAULT_RESEND_COOLDOWN_SECONDS: i64 = 60;

/// Lifecycle of a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    /// No challenge outstanding; the phone number can be submitted
    AwaitingSubmission,
    /// A challenge is outstanding and a code can be confirmed
    ChallengeSent,
    /// A code is being checked by the provider
    Confirming,
    /// The phone number was verified
    Verified,
    /// The last code was rejected
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::AwaitingSubmission => "awaiting-submission",
            VerificationStatus::ChallengeSent => "challenge-sent",
            VerificationStatus::Confirming => "confirming",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStatus::Verified)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a confirmation request was dropped without reaching the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Another confirmation is in flight
    InFlight,
    /// The same code was already attempted against this challenge
    DuplicateCode,
    /// Fewer characters than a full code were entered
    Incomplete,
    /// The automatic capture was cancelled before it could confirm
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InFlight => "in-flight",
            SkipReason::DuplicateCode => "duplicate-code",
            SkipReason::Incomplete => "incomplete",
            SkipReason::Cancelled => "cancelled",
        }
    }
}

/// Outcome of the confirmation gate
#[derive(Debug)]
pub enum ConfirmGate {
    /// Silently dropped
    Skip(SkipReason),
    /// Refused with an error the user should see
    Reject(VerificationError),
}

/// State of a single phone verification attempt
///
/// Every transition goes through a method so that at most one challenge is
/// outstanding and a confirmation only ever runs against it.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    id: Uuid,
    phone_number: Option<String>,
    challenge: Option<ChallengeHandle>,
    cooldown_expiry: Option<DateTime<Utc>>,
    last_attempted_code: Option<String>,
    code_input: String,
    status: VerificationStatus,
    rejected_attempts: u32,
    created_at: DateTime<Utc>,
}

impl VerificationSession {
    /// Create a session waiting for a phone number
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), now)
    }

    /// Create a session with a caller-chosen identifier
    pub fn with_id(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phone_number: None,
            challenge: None,
            cooldown_expiry: None,
            last_attempted_code: None,
            code_input: String::new(),
            status: VerificationStatus::AwaitingSubmission,
            rejected_attempts: 0,
            created_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn challenge(&self) -> Option<&ChallengeHandle> {
        self.challenge.as_ref()
    }

    pub fn has_challenge(&self) -> bool {
        self.challenge.is_some()
    }

    pub fn last_attempted_code(&self) -> Option<&str> {
        self.last_attempted_code.as_deref()
    }

    pub fn code_input(&self) -> &str {
        &self.code_input
    }

    pub fn rejected_attempts(&self) -> u32 {
        self.rejected_attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Cooldown expiry, only while it lies in the future
    pub fn active_cooldown(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cooldown_expiry.filter(|expiry| *expiry > now)
    }

    /// Whole seconds left before another dispatch is allowed (rounded up)
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> u64 {
        self.cooldown_expiry
            .map(|expiry| remaining_seconds(expiry, now))
            .unwrap_or(0)
    }

    pub fn start_cooldown(&mut self, expiry: DateTime<Utc>) {
        self.cooldown_expiry = Some(expiry);
    }

    /// Adopt a persisted expiry if it is later than the one already held
    pub fn restore_cooldown(&mut self, expiry: DateTime<Utc>) {
        match self.cooldown_expiry {
            Some(current) if current >= expiry => {}
            _ => self.cooldown_expiry = Some(expiry),
        }
    }

    /// Drop the outstanding challenge before a new one is requested
    pub fn invalidate_challenge(&mut self) {
        self.challenge = None;
        if self.status != VerificationStatus::Verified {
            self.status = VerificationStatus::AwaitingSubmission;
        }
    }

    /// Record a challenge the provider just issued
    pub fn challenge_issued(&mut self, phone_number: impl Into<String>, challenge: ChallengeHandle) {
        self.phone_number = Some(phone_number.into());
        self.challenge = Some(challenge);
        self.last_attempted_code = None;
        self.code_input.clear();
        self.status = VerificationStatus::ChallengeSent;
    }

    /// Replace the code input; editing after a rejection resumes code entry
    pub fn set_code_input(&mut self, value: impl Into<String>) {
        self.code_input = value.into();
        if self.status == VerificationStatus::Failed {
            self.status = VerificationStatus::ChallengeSent;
        }
    }

    /// Gate a confirmation and, when it passes, move into `Confirming`
    ///
    /// Returns the challenge the code must be checked against.
    pub fn begin_confirmation(
        &mut self,
        code: &str,
        code_length: usize,
        allow_identical_resubmit: bool,
    ) -> Result<ChallengeHandle, ConfirmGate> {
        let is_repeat = self.last_attempted_code.as_deref() == Some(code);

        match self.status {
            VerificationStatus::Verified => {
                return Err(ConfirmGate::Reject(VerificationError::AlreadyVerified));
            }
            VerificationStatus::Confirming => {
                let reason = if is_repeat {
                    SkipReason::DuplicateCode
                } else {
                    SkipReason::InFlight
                };
                return Err(ConfirmGate::Skip(reason));
            }
            _ => {}
        }

        let challenge = match &self.challenge {
            Some(challenge) => challenge.clone(),
            None => return Err(ConfirmGate::Reject(VerificationError::NoActiveChallenge)),
        };

        let actual = code.chars().count();
        if actual != code_length {
            return Err(ConfirmGate::Reject(VerificationError::InvalidCodeLength {
                expected: code_length,
                actual,
            }));
        }

        if is_repeat && !allow_identical_resubmit {
            return Err(ConfirmGate::Skip(SkipReason::DuplicateCode));
        }

        self.last_attempted_code = Some(code.to_string());
        self.code_input = code.to_string();
        self.status = VerificationStatus::Confirming;
        Ok(challenge)
    }

    /// The provider accepted the code; the challenge is consumed
    pub fn confirmation_succeeded(&mut self) {
        self.challenge = None;
        self.status = VerificationStatus::Verified;
    }

    /// The provider rejected the code
    ///
    /// The session stays `Failed` until the code input changes; the challenge
    /// stays usable for another code.
    pub fn confirmation_failed(&mut self) {
        self.rejected_attempts += 1;
        self.status = if self.challenge.is_some() {
            VerificationStatus::Failed
        } else {
            VerificationStatus::AwaitingSubmission
        };
    }

    /// A confirmation was abandoned before the provider answered
    pub fn abort_confirmation(&mut self) {
        if self.status == VerificationStatus::Confirming {
            self.last_attempted_code = None;
            self.status = if self.challenge.is_some() {
                VerificationStatus::ChallengeSent
            } else {
                VerificationStatus::AwaitingSubmission
            };
        }
    }

    /// Go back to phone entry, discarding the outstanding challenge
    pub fn return_to_phone_entry(&mut self) -> Result<(), VerificationError> {
        match self.status {
            VerificationStatus::Confirming => Err(VerificationError::ConfirmationInFlight),
            VerificationStatus::Verified => Err(VerificationError::AlreadyVerified),
            _ => {
                self.challenge = None;
                self.last_attempted_code = None;
                self.code_input.clear();
                self.status = VerificationStatus::AwaitingSubmission;
                Ok(())
            }
        }
    }
}

/// Whole seconds from `now` until `expiry`, rounded up, never negative
pub fn remaining_seconds(expiry: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (expiry - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        ((millis + 999) / 1000) as u64
    }
}
