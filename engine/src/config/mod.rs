//! Configuration management
//!
//! This module handles loading and validating the Pagesmith configuration.
//! Configuration is stored in TOML format, by default at `./pagesmith.toml`.
//! Every section and every key is optional; a missing file yields the
//! built-in defaults.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory and log level
//! - **server**: HTTP bind address and request body limit
//! - **llm**: Text generation provider settings
//! - **github**: Repository hosting API, Pages polling and retry timing
//! - **notifier**: Webhook retry schedule
//! - **orchestrator**: Round 2 redeploy behaviour
//! - **queue**: Job queue capacity
//!
//! Credentials never live in this file. They are read from the environment
//! (see [`crate::secrets`]).
//!
//! # Examples
//!
//! ```no_run
//! use pagesmith_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default(None)?;
//! println!("Data dir: {:?}", config.core.data_dir);
//! println!("Bind: {}", config.server.bind);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pagesmith.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Text generation provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Repository hosting configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Webhook notification configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Round sequencing configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Job queue configuration
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path holding `tasks.json` (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted request body in bytes (attachments are inline)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
    // Note: API key comes from GEMINI_API_KEY, not from config
}

/// GitHub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_github_api_base_url")]
    pub api_base_url: String,

    /// Domain serving Pages sites, `https://{owner}.{pages_domain}/{repo}/`
    #[serde(default = "default_pages_domain")]
    pub pages_domain: String,

    /// Branch that receives commits and is served by Pages
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Description set on created repositories
    #[serde(default = "default_repo_description")]
    pub repo_description: String,

    /// Pause after repository creation (seconds)
    #[serde(default = "default_init_settle")]
    pub init_settle_secs: u64,

    /// Branch reference lookups before giving up
    #[serde(default = "default_ref_retry_attempts")]
    pub ref_retry_attempts: u32,

    /// Pause between branch reference lookups (seconds)
    #[serde(default = "default_ref_retry_delay")]
    pub ref_retry_delay_secs: u64,

    /// Probes of the public Pages URL before giving up
    #[serde(default = "default_pages_poll_attempts")]
    pub pages_poll_attempts: u32,

    /// Pause between Pages probes (seconds)
    #[serde(default = "default_pages_poll_interval")]
    pub pages_poll_interval_secs: u64,

    /// Timeout of a single Pages probe (seconds)
    #[serde(default = "default_pages_probe_timeout")]
    pub pages_probe_timeout_secs: u64,

    /// Timeout of a single REST call (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Wait after each failed attempt (seconds); one attempt per entry
    #[serde(default = "default_notifier_delays")]
    pub delays_secs: Vec<u64>,

    /// Per-attempt timeout (seconds)
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

/// How round 2 waits for Pages to pick up the new commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeployMode {
    /// Fixed sleep of `redeploy_settle_secs`
    Sleep,
    /// Poll the public URL like round 1 does
    Poll,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Round 2 settle delay in `sleep` mode (seconds)
    #[serde(default = "default_redeploy_settle")]
    pub redeploy_settle_secs: u64,

    /// Round 2 redeploy wait strategy
    #[serde(default = "default_redeploy_mode")]
    pub redeploy_mode: RedeployMode,
}

/// Job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Pending jobs accepted before the API answers 503
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_body_bytes() -> usize {
    api_server::DEFAULT_MAX_BODY_BYTES
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_output_tokens() -> u32 {
    4000
}

fn default_gemini_timeout() -> u64 {
    60
}

fn default_github_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_pages_domain() -> String {
    "github.io".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_repo_description() -> String {
    "Auto-generated application".to_string()
}

fn default_init_settle() -> u64 {
    2
}

fn default_ref_retry_attempts() -> u32 {
    5
}

fn default_ref_retry_delay() -> u64 {
    2
}

fn default_pages_poll_attempts() -> u32 {
    24
}

fn default_pages_poll_interval() -> u64 {
    5
}

fn default_pages_probe_timeout() -> u64 {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_notifier_delays() -> Vec<u64> {
    vec![1, 2, 4, 8, 16]
}

fn default_notifier_timeout() -> u64 {
    30
}

fn default_redeploy_settle() -> u64 {
    30
}

fn default_redeploy_mode() -> RedeployMode {
    RedeployMode::Sleep
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api_base_url(),
            pages_domain: default_pages_domain(),
            branch: default_branch(),
            repo_description: default_repo_description(),
            init_settle_secs: default_init_settle(),
            ref_retry_attempts: default_ref_retry_attempts(),
            ref_retry_delay_secs: default_ref_retry_delay(),
            pages_poll_attempts: default_pages_poll_attempts(),
            pages_poll_interval_secs: default_pages_poll_interval(),
            pages_probe_timeout_secs: default_pages_probe_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            delays_secs: default_notifier_delays(),
            timeout_secs: default_notifier_timeout(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            redeploy_settle_secs: default_redeploy_settle(),
            redeploy_mode: default_redeploy_mode(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

impl NotifierConfig {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}

impl Config {
    /// Load configuration from `path`, or from `./pagesmith.toml` when `path`
    /// is `None`.
    ///
    /// A missing default file yields the built-in defaults. An explicitly
    /// requested file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicit configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_path(&default_path)
                } else {
                    let mut config = Self::default();
                    config.validate_and_process()?;
                    Ok(config)
                }
            }
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Path of the JSON task store
    pub fn tasks_file(&self) -> PathBuf {
        self.core.data_dir.join("tasks.json")
    }

    /// Validate values and expand paths
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level is unknown
    /// - The temperature is outside [0, 2]
    /// - The notifier schedule is empty
    /// - Attempt counts, the body limit or the queue capacity are zero
    /// - Path expansion fails
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let temperature = self.llm.gemini.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(EngineError::Config(
                "llm.gemini.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.notifier.delays_secs.is_empty() {
            return Err(EngineError::Config(
                "notifier.delays_secs must contain at least one entry".to_string(),
            ));
        }

        if self.github.ref_retry_attempts == 0 {
            return Err(EngineError::Config(
                "github.ref_retry_attempts must be at least 1".to_string(),
            ));
        }

        if self.github.pages_poll_attempts == 0 {
            return Err(EngineError::Config(
                "github.pages_poll_attempts must be at least 1".to_string(),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(EngineError::Config(
                "server.max_body_bytes must be at least 1".to_string(),
            ));
        }

        if self.queue.capacity == 0 {
            return Err(EngineError::Config(
                "queue.capacity must be at least 1".to_string(),
            ));
        }

        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                EngineError::Config(format!("Invalid server.bind '{}': {}", self.server.bind, e))
            })?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_behaviour() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.gemini.max_output_tokens, 4000);
        assert_eq!(config.github.ref_retry_attempts, 5);
        assert_eq!(config.github.pages_poll_attempts, 24);
        assert_eq!(config.notifier.delays_secs, vec![1, 2, 4, 8, 16]);
        assert_eq!(config.orchestrator.redeploy_mode, RedeployMode::Sleep);
        assert_eq!(config.orchestrator.redeploy_settle_secs, 30);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.server.max_body_bytes, 32 * 1024 * 1024);
        assert_eq!(config.github.branch, "main");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [github]
            pages_domain = "pages.example.com"

            [orchestrator]
            redeploy_mode = "poll"
            "#,
        )
        .unwrap();

        assert_eq!(config.github.pages_domain, "pages.example.com");
        assert_eq!(config.github.api_base_url, "https://api.github.com");
        assert_eq!(config.orchestrator.redeploy_mode, RedeployMode::Poll);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "[core]\nlog_level = \"loud\"",
            "[llm.gemini]\ntemperature = 3.5",
            "[notifier]\ndelays_secs = []",
            "[queue]\ncapacity = 0",
            "[server]\nbind = \"nowhere\"",
            "[server]\nmax_body_bytes = 0",
            "[orchestrator]\nredeploy_mode = \"wait\"",
        ];
        for case in cases {
            let err = Config::from_toml_str(case).unwrap_err();
            assert!(matches!(err, EngineError::Config(_)), "case {:?}", case);
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.notifier.delays_secs, deserialized.notifier.delays_secs);
    }
}
