//! Auth provider module
//!
//! Implementations of the phone challenge provider:
//!
//! - **Identity Toolkit**: production REST API
//! - **Test numbers**: fictional numbers with fixed codes, no network

pub mod identity_toolkit;
pub mod test_numbers;


pub use identity_toolkit::{IdentityToolkitConfig, IdentityToolkitProvider};
pub use test_numbers::TestNumberAuthProvider;
