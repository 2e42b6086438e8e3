//! Domain-specific error types and error handling.

mod types;


// Re-export all error types
pub use types::{BotCheckError, ConfirmError, ProviderError, StorageError};

use ds_shared::error_codes;
use thiserror::Error;

/// Errors surfaced by the phone verification flow
///
/// Messages here are the English defaults used in logs; the presentation
/// layer looks up localized text by `code()`.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Please wait {remaining_seconds}s before requesting a new code")]
    CooldownActive { remaining_seconds: u64 },

    #[error("Phone number is required")]
    MissingPhoneNumber,

    #[error("A verification code request is already in progress")]
    DispatchInFlight,

    #[error("A code confirmation is already in progress")]
    ConfirmationInFlight,

    #[error("No verification code has been requested")]
    NoActiveChallenge,

    #[error("Verification code must be {expected} characters, got {actual}")]
    InvalidCodeLength { expected: usize, actual: usize },

    #[error("Invalid code. Please try again.")]
    InvalidCode,

    #[error("Phone number already verified")]
    AlreadyVerified,

    #[error("Failed to send verification code: {0}")]
    Dispatch(#[source] ProviderError),

    #[error("Verification provider error: {0}")]
    Provider(#[source] ProviderError),

    #[error("Verification flow has not been initialized")]
    NotInitialized,

    #[error("Verification flow was already initialized")]
    AlreadyInitialized,

    #[error("Verification flow has been disposed")]
    Disposed,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VerificationError {
    /// Stable error code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            VerificationError::CooldownActive { .. } => error_codes::COOLDOWN_ACTIVE,
            VerificationError::MissingPhoneNumber => error_codes::PHONE_REQUIRED,
            VerificationError::DispatchInFlight | VerificationError::ConfirmationInFlight => {
                error_codes::DISPATCH_IN_PROGRESS
            }
            VerificationError::NoActiveChallenge => error_codes::NO_ACTIVE_CHALLENGE,
            VerificationError::InvalidCodeLength { .. } => error_codes::VERIFICATION_CODE_LENGTH,
            VerificationError::InvalidCode => error_codes::VERIFICATION_CODE_INVALID,
            VerificationError::AlreadyVerified => error_codes::ALREADY_VERIFIED,
            VerificationError::Dispatch(_) => error_codes::DISPATCH_FAILED,
            VerificationError::Provider(_) => error_codes::PROVIDER_UNAVAILABLE,
            VerificationError::NotInitialized
            | VerificationError::AlreadyInitialized
            | VerificationError::Disposed => error_codes::SESSION_CLOSED,
            VerificationError::Storage(_) => error_codes::STORAGE_ERROR,
        }
    }

    /// Whether the user can fix this by acting again (waiting, retyping)
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            VerificationError::CooldownActive { .. }
                | VerificationError::MissingPhoneNumber
                | VerificationError::InvalidCodeLength { .. }
                | VerificationError::InvalidCode
                | VerificationError::Dispatch(_)
        )
    }
}

pub type VerificationResult<T> = Result<T, VerificationError>;
