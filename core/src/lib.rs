//! # DriveSync Core
//!
//! Core business logic for DriveSync phone sign-up.
//! This crate contains the verification session entity, the verification
//! flow state machine, the capability traits its adapters implement, and
//! the error types shared by the API and infrastructure layers.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
