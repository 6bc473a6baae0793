//! Error types and handling
//!
//! This module provides the error taxonomy shared by the engine and the API
//! server. All errors implement the `ErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry the inbound secret, the hosting token or the
//! generation API key.

use thiserror::Error;

/// Trait for engine error extensions
///
/// Provides additional context for errors, including user-friendly hints
/// and recoverability information.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by resubmitting the request.
    /// Non-recoverable errors need a configuration or data fix first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Validation / Unauthorized**: inbound request rejected synchronously
/// - **Publish**: repository hosting API failures, fatal to a round
/// - **Store**: task store read/write failures
/// - **Queue**: the job queue cannot take another request
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::validation("email", "Invalid email format");
/// assert_eq!(error.to_string(), "Invalid email format");
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::NoPriorRound("hello-world".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Inbound request errors
    #[error("{reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid secret")]
    Unauthorized,

    // Pipeline errors
    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("No round 1 info found for task: {0}")]
    NoPriorRound(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Job queue errors
    #[error("Queue error: {0}")]
    Queue(String),
}

impl EngineError {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status the inbound boundary answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized => 401,
            Self::Queue(_) => 503,
            _ => 500,
        }
    }
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your pagesmith.toml file for errors",
            Self::Validation { .. } => "Fix the request body and resubmit",
            Self::Unauthorized => "The request secret does not match the server secret",
            Self::Publish(_) => "Repository hosting failed. Check the token and username",
            Self::Store(_) => "Task store operation failed. Check the data directory",
            Self::NoPriorRound(_) => "Submit round 1 for this task before round 2",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Queue(_) => "The server is busy. Try again shortly",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::Unauthorized | Self::NoPriorRound(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_is_reason_only() {
        let err = EngineError::validation("round", "round must be 1 or 2");
        assert_eq!(err.to_string(), "round must be 1 or 2");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(EngineError::Unauthorized.status_code(), 401);
        assert_eq!(EngineError::Queue("full".into()).status_code(), 503);
        assert_eq!(EngineError::Store("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::Network("reset".into()).is_recoverable());
        assert!(!EngineError::Config("bad".into()).is_recoverable());
        assert!(!EngineError::Unauthorized.is_recoverable());
    }
}
