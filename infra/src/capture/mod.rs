//! Automatic code capture module

pub mod sms_inbox;

pub use sms_inbox::{extract_origin_bound_code, SmsInboxCapture};
