//! Value objects representing immutable domain concepts.

pub mod handles;
pub mod route;
pub mod verified_identity;

// Re-export commonly used types
pub use handles::{BotCheckToken, ChallengeHandle, WidgetHandle};
pub use route::PostVerificationRoute;
pub use verified_identity::VerifiedIdentity;
