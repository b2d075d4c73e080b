//! Error types shared by the evasion components.
//!
//! Generation operations are all-or-nothing: when one of them fails it returns
//! an [`EvasionError`] and never a partially built path, plan or profile.

use thiserror::Error;

/// Result type for evasion operations
pub type EvasionResult<T> = Result<T, EvasionError>;

/// Errors returned by the fingerprint, input, detection and throttle components
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvasionError {
    /// Malformed coordinates, empty identifiers, negative durations and similar.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An identifier that does not refer to a known object.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A platform string outside windows/mac/linux.
    #[error("Invalid platform: {0}")]
    InvalidPlatform(String),
}

impl EvasionError {
    /// Stable machine-readable code, used by the command layer.
    pub fn code(&self) -> &'static str {
        match self {
            EvasionError::InvalidInput(_) => "invalid_input",
            EvasionError::NotFound(_) => "not_found",
            EvasionError::InvalidPlatform(_) => "invalid_platform",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EvasionError::InvalidInput(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        EvasionError::NotFound(message.into())
    }
}
