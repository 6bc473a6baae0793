//! Repository publishing
//!
//! A [`Publisher`] creates a repository, commits a [`FileSet`] to its branch
//! as exactly one commit, and turns on static hosting. [`GitHubPublisher`]
//! talks to the GitHub REST API; tests drive the orchestrator with a
//! recording fake instead.

pub mod github;

pub use github::{GitHubPublisher, PublishTiming};

use async_trait::async_trait;
use sdk::{EngineError, FileSet};

/// Errors raised while publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Repository not ready after {attempts} attempts: {last}")]
    BranchNotReady { attempts: u32, last: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("GitHub credentials not configured (GITHUB_TOKEN and GITHUB_USERNAME)")]
    MissingCredentials,
}

impl From<PublishError> for EngineError {
    fn from(err: PublishError) -> Self {
        EngineError::Publish(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// Hosting operations used by the orchestrator
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a public repository with an initialised default branch and
    /// return its web URL
    async fn create_repository(&self, name: &str) -> Result<String>;

    /// Commit `files` on top of the branch head, waiting for the branch to
    /// appear. Returns the new commit id.
    async fn publish(&self, repo: &str, files: &FileSet) -> Result<String>;

    /// Like [`Publisher::publish`], but creates a parentless initial commit
    /// when the branch definitely does not exist instead of waiting for it.
    /// Lookups that fail outright are still retried.
    async fn publish_or_init(&self, repo: &str, files: &FileSet) -> Result<String>;

    /// Request static hosting and poll until the site answers.
    ///
    /// A site that never comes up is a warning, not an error; the computed
    /// URL is returned either way.
    async fn enable_hosting(&self, repo: &str) -> Result<String>;

    /// Public URL the repository will be served from
    fn pages_url(&self, repo: &str) -> Result<String>;

    /// Probe `url` until it answers 200. Returns whether it did.
    async fn wait_for_pages(&self, url: &str) -> bool;
}
