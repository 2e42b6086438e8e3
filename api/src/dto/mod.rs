//! Request and response bodies of the phone verification API

pub mod session;

pub use session::*;
