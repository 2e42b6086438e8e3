//! Durable key-value storage
//!
//! Backends for the small amount of client state that must survive a
//! reload: the resend cooldown expiry, the selected role and the language.

pub mod file;
pub mod memory;

#[cfg(feature = "redis-cache")]
pub mod redis;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

#[cfg(feature = "redis-cache")]
pub use self::redis::RedisKeyValueStore;
