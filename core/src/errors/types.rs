//! Errors reported by the flow's collaborators
//!
//! Adapters translate their backend failures into these types so the flow
//! can classify them without knowing which provider, widget or store is
//! behind the trait.

use thiserror::Error;

/// Failures while issuing a phone challenge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Invalid phone number: {phone}")]
    InvalidPhoneNumber { phone: String },

    #[error("Too many verification requests")]
    QuotaExceeded,

    #[error("Bot check failed: {reason}")]
    BotCheckFailed { reason: String },

    #[error("Provider rejected the request ({code})")]
    Rejected { code: String },

    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
        }
    }

    /// Whether retrying the same request later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::QuotaExceeded
                | ProviderError::BotCheckFailed { .. }
                | ProviderError::Unavailable { .. }
        )
    }
}

/// Failures while confirming a code against a challenge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// Wrong or expired code
    #[error("Invalid verification code")]
    InvalidCode,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Bot-check widget failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotCheckError {
    /// A widget is already rendered into the container
    #[error("Bot check already rendered in container {container}")]
    AlreadyRendered { container: String },

    #[error("Bot check widget not found")]
    WidgetNotFound,

    #[error("Bot check token unavailable: {reason}")]
    TokenUnavailable { reason: String },
}

impl From<BotCheckError> for ProviderError {
    fn from(error: BotCheckError) -> Self {
        ProviderError::BotCheckFailed {
            reason: error.to_string(),
        }
    }
}

/// Durable key-value storage failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    /// A stored value could not be interpreted
    #[error("Corrupt value stored under {key}")]
    CorruptValue { key: String },
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend {
            message: message.into(),
        }
    }
}
