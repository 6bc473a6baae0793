//! Pagesmith Engine Library
//!
//! Generates single-file web applications from a brief, publishes them to a
//! GitHub repository served by Pages, and reports the result to a webhook.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Credential loading and log scrubbing
pub mod secrets;

/// Telemetry and Observability
pub mod telemetry;

/// LLM provider abstraction layer
pub mod llm;

/// HTML, README and LICENSE generation
pub mod generator;

/// Repository publishing and Pages hosting
pub mod publisher;

/// Evaluation webhook notifier
pub mod notifier;

/// Task record persistence
pub mod store;

/// Round sequencing
pub mod orchestrator;

/// Background job queue and worker
pub mod queue;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
