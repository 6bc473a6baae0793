//! Pagesmith SDK
//!
//! Shared library providing the build-request model, inbound validation,
//! and the error taxonomy used by the engine and the API server.

/// Submission seam between the HTTP boundary and the engine
pub mod submit;

/// Error types and handling
pub mod errors;

/// Build request, file set and notification types
pub mod types;

/// Inbound request validation
pub mod validation;

/// Redacting wrapper for secret strings
pub mod secret;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use secret::SecretString;
pub use submit::{BuildSubmitter, SubmitHandle};
pub use types::{
    Acknowledgment, Attachment, BuildRequest, FileSet, NotificationPayload, Round,
};
