//! Post-verification onboarding
//!
//! Remembers the role picked before sign-up and decides where a verified
//! user continues.

mod service;

pub use service::OnboardingRouter;
