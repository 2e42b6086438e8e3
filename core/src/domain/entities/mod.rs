//! Domain entities representing core business objects.

pub mod verification_session;


// Re-export commonly used types
pub use verification_session::{
    remaining_seconds, ConfirmGate, SkipReason, VerificationSession, VerificationStatus,
    CODE_LENGTH, DEFAULT_RESEND_COOLDOWN_SECONDS,
};
