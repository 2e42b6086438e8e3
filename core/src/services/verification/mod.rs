//! Phone verification flow
//!
//! This module provides the client-side verification workflow including:
//! - Challenge dispatch guarded by a persisted resend cooldown
//! - Code confirmation with duplicate and overlap suppression
//! - Invisible bot-check lifecycle
//! - Automatic code capture on supported platforms

mod bot_check;
mod capture;
mod config;
mod cooldown;
mod flow;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use bot_check::BotCheckSlot;
pub use capture::CaptureListener;
pub use config::FlowConfig;
pub use cooldown::{CooldownStore, Countdown};
pub use flow::{VerificationFlow, VerificationFlowBuilder};
pub use traits::{
    AuthProvider, BotCheckWidget, CapabilityProbe, Clock, CodeCapture, KeyValueStore,
    PlatformCapabilities, SystemClock,
};
pub use types::{CodeOrigin, ConfirmOutcome, DispatchOutcome, SessionSnapshot};
