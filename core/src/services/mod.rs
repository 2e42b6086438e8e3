//! Business services containing domain logic and use cases.

pub mod onboarding;
pub mod verification;

// Re-export commonly used types
pub use onboarding::OnboardingRouter;
pub use verification::{
    AuthProvider, BotCheckWidget, CapabilityProbe, Clock, CodeCapture, ConfirmOutcome,
    DispatchOutcome, FlowConfig, KeyValueStore, PlatformCapabilities, SessionSnapshot,
    SystemClock, VerificationFlow, VerificationFlowBuilder,
};
