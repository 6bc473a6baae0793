//! Credentials and secret scrubbing
//!
//! All credentials are read from the process environment (optionally
//! populated from a `.env` file by the binary). Nothing secret is stored in
//! the TOML configuration.
//!
//! | Variable          | Used for                                   |
//! |-------------------|--------------------------------------------|
//! | `GEMINI_API_KEY`  | text generation; absent means template only |
//! | `GITHUB_TOKEN`    | repository publishing                      |
//! | `GITHUB_USERNAME` | repository owner and Pages host            |
//! | `MY_SECRET`       | shared secret checked on inbound requests  |

pub use sdk::secret::SecretString;

use regex::Regex;
use std::sync::OnceLock;

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GITHUB_USERNAME: &str = "GITHUB_USERNAME";
pub const INBOUND_SECRET: &str = "MY_SECRET";

/// Owner name and token used against the hosting API
#[derive(Debug, Clone)]
pub struct GitHubCredentials {
    pub username: String,
    pub token: SecretString,
}

/// Every credential the engine may use
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<SecretString>,
    pub github: Option<GitHubCredentials>,
    pub inbound_secret: Option<SecretString>,
}

impl Secrets {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let github = match (read(GITHUB_USERNAME), read(GITHUB_TOKEN)) {
            (Some(username), Some(token)) => Some(GitHubCredentials {
                username,
                token: SecretString::new(token),
            }),
            (None, Some(_)) => {
                tracing::warn!("{} is set but {} is not", GITHUB_TOKEN, GITHUB_USERNAME);
                None
            }
            (Some(_), None) => {
                tracing::warn!("{} is set but {} is not", GITHUB_USERNAME, GITHUB_TOKEN);
                None
            }
            (None, None) => None,
        };

        Self {
            gemini_api_key: read(GEMINI_API_KEY).map(SecretString::new),
            github,
            inbound_secret: read(INBOUND_SECRET).map(SecretString::new),
        }
    }

    /// Log which credentials are present, never their values
    pub fn log_presence(&self) {
        tracing::info!(
            gemini = self.gemini_api_key.is_some(),
            github = self.github.is_some(),
            inbound_secret = self.inbound_secret.is_some(),
            "Credentials loaded"
        );
        if self.gemini_api_key.is_none() {
            tracing::warn!("{} not set, every build will use the fallback template", GEMINI_API_KEY);
        }
        if self.inbound_secret.is_none() {
            tracing::warn!("{} not set, every build request will be rejected", INBOUND_SECRET);
        }
    }
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns for credentials that can leak into error text.
///
/// Patterns match:
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - `key=` query parameters (reqwest errors echo the request URL)
/// - GitHub classic and fine-grained tokens
/// - Bearer tokens
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"AIza[0-9A-Za-z\-_]{35}").expect("Invalid Google pattern"),
            Regex::new(r"([?&]key=)[^&\s)]+").expect("Invalid query key pattern"),
            Regex::new(r"gh[pousr]_[a-zA-Z0-9]{36}").expect("Invalid GitHub pattern"),
            Regex::new(r"github_pat_[a-zA-Z0-9_]{22,}").expect("Invalid GitHub PAT pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| match caps.get(1) {
                Some(prefix) => format!("{}[REDACTED]", prefix.as_str()),
                None => "[REDACTED]".to_string(),
            })
            .to_string();
    }

    result
}
