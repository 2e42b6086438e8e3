//! Common utility functions

pub mod phone;
pub mod platform;

// Re-export commonly used utilities
pub use phone::*;
pub use platform::*;
