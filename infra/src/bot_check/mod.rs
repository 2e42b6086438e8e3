//! Bot-check widget module

pub mod invisible;

pub use invisible::InvisibleRecaptcha;
