//! Shared utilities and common types for the DriveSync services
//!
//! This crate provides common functionality used across all workspace crates:
//! - Configuration types and loading
//! - Error response structures and error codes
//! - Utility functions (phone numbers, platform probing)
//! - Common type definitions (language, role, API responses)

pub mod config;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, ConfigError, CorsConfig, Environment, LoggingConfig, ProviderConfig,
    ServerConfig, StorageConfig, VerificationConfig,
};
pub use errors::{error_codes, ApiResult, ErrorResponse, IntoErrorResponse};
pub use types::{ApiResponse, Language, Role};
pub use utils::{phone, platform};
