//! LLM Provider Abstraction Layer
//!
//! The content generator only needs one thing from a model: turn a prompt
//! into text. The [`LLMProvider`] trait captures that contract so the
//! generator can run against Gemini in production and against a canned
//! provider in tests.
//!
//! Every failure is reported as an [`LLMError`]. The generator treats all of
//! them the same way (fall back to the template), but the variants keep the
//! logs specific.

use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate text for a single-turn prompt
    ///
    /// # Returns
    /// * `Ok(String)` - Non-empty generated text
    /// * `Err(LLMError)` - If the request fails, times out, is blocked or empty
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is currently usable
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}
