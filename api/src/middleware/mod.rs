pub mod client;
pub mod cors;
