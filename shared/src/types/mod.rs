//! Type definitions module
//!
//! - `language` - Languages for user-facing messages
//! - `response` - API response wrapper
//! - `role` - Account role chosen before sign-up

pub mod language;
pub mod response;
pub mod role;

pub use language::Language;
pub use response::ApiResponse;
pub use role::Role;
