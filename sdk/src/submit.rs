//! Submission seam
//!
//! The API server only knows how to hand a validated request to something
//! that implements [`BuildSubmitter`]. The engine implements it with its job
//! queue, tests implement it with a recording fake.

use crate::errors::EngineError;
use crate::types::BuildRequest;
use std::sync::Arc;

/// Trait for accepting build requests (to be implemented by engine)
pub trait BuildSubmitter: Send + Sync {
    /// Enqueue a request for background processing.
    ///
    /// Must not block on the processing itself.
    fn submit(&self, request: BuildRequest) -> Result<(), EngineError>;
}

/// Cloneable handle around a [`BuildSubmitter`] implementation
#[derive(Clone)]
pub struct SubmitHandle {
    inner: Arc<dyn BuildSubmitter>,
}

impl SubmitHandle {
    /// Create a new SubmitHandle with the given implementation
    pub fn new(inner: Arc<dyn BuildSubmitter>) -> Self {
        Self { inner }
    }

    /// Hand a request over for background processing
    pub fn submit(&self, request: BuildRequest) -> Result<(), EngineError> {
        self.inner.submit(request)
    }
}
