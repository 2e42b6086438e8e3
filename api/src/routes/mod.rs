//! HTTP route handlers
//!
//! - `health` - liveness and API overview
//! - `sessions` - phone verification sessions

pub mod health;
pub mod sessions;
