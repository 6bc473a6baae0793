//! Content generation
//!
//! Turns a brief, its checks and its attachments into the [`FileSet`] that
//! gets committed: `index.html`, `README.md` and, for round 1, `LICENSE`.
//!
//! Generation never fails. The model is asked first; if it is unavailable,
//! times out, is blocked, or answers with something that is not a complete
//! HTML document, the deterministic template in [`template`] is used instead.

pub mod docs;
pub mod prompt;
pub mod template;

use crate::llm::LLMProvider;
use chrono::{Datelike, Utc};
use regex::Regex;
use sdk::{Attachment, FileSet};
use std::sync::{Arc, OnceLock};

pub const INDEX_FILE: &str = "index.html";
pub const README_FILE: &str = "README.md";
pub const LICENSE_FILE: &str = "LICENSE";

/// Which path produced `index.html`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    Model,
    Template,
}

/// Result of a generation call
#[derive(Debug, Clone)]
pub struct Generated {
    pub files: FileSet,
    pub source: GenerationSource,
}

/// Brief and checks of the round being amended
#[derive(Debug, Clone)]
pub struct PriorRound {
    pub brief: String,
    pub checks: Vec<String>,
}

/// Content generator with an optional model behind it
#[derive(Clone)]
pub struct ContentGenerator {
    provider: Option<Arc<dyn LLMProvider>>,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Generator that always renders the template
    pub fn template_only() -> Self {
        Self { provider: None }
    }

    /// Round 1 files: index, README and LICENSE
    pub async fn generate(
        &self,
        brief: &str,
        checks: &[String],
        attachments: &[Attachment],
    ) -> Generated {
        let prompt = prompt::initial_prompt(brief, checks, attachments);
        let now = Utc::now();

        let (index, source) = match self.ask_model(&prompt).await {
            Some(html) => (html, GenerationSource::Model),
            None => (
                template::render_index(brief, checks, now),
                GenerationSource::Template,
            ),
        };

        let files = FileSet::new()
            .with(INDEX_FILE, index)
            .with(README_FILE, docs::readme(brief, checks))
            .with(LICENSE_FILE, docs::license_mit(now.year()));

        Generated { files, source }
    }

    /// Round 2 files: index and README, no LICENSE
    pub async fn generate_update(
        &self,
        prior: &PriorRound,
        brief: &str,
        checks: &[String],
        attachments: &[Attachment],
    ) -> Generated {
        let prompt = prompt::update_prompt(&prior.brief, &prior.checks, brief, checks, attachments);

        let mut combined_checks = prior.checks.clone();
        combined_checks.extend(checks.iter().cloned());

        match self.ask_model(&prompt).await {
            Some(html) => {
                let readme_brief = format!("{}\n\nUPDATED: {}", prior.brief, brief);
                let files = FileSet::new()
                    .with(INDEX_FILE, html)
                    .with(README_FILE, docs::readme(&readme_brief, &combined_checks));
                Generated {
                    files,
                    source: GenerationSource::Model,
                }
            }
            None => {
                let combined_brief = format!("{}\n\nUPDATE: {}", prior.brief, brief);
                let files = FileSet::new()
                    .with(
                        INDEX_FILE,
                        template::render_index(&combined_brief, &combined_checks, Utc::now()),
                    )
                    .with(README_FILE, docs::readme(&combined_brief, &combined_checks));
                Generated {
                    files,
                    source: GenerationSource::Template,
                }
            }
        }
    }

    /// Ask the model and return an acceptable, trimmed document, or `None`
    async fn ask_model(&self, prompt: &str) -> Option<String> {
        let provider = match &self.provider {
            Some(provider) => provider,
            None => {
                tracing::info!("No generation provider configured, using template");
                return None;
            }
        };

        if !provider.check_health().await {
            tracing::info!(provider = provider.name(), "Provider not ready, using template");
            return None;
        }

        match provider.generate(prompt).await {
            Ok(text) => {
                let html = extract_html(&text).trim().to_string();
                if is_acceptable_html(&html) {
                    tracing::info!(provider = provider.name(), "Model generated valid HTML");
                    Some(html)
                } else {
                    tracing::warn!(
                        provider = provider.name(),
                        chars = html.len(),
                        "Model output is not a complete HTML document, using template"
                    );
                    None
                }
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Generation unavailable, using template");
                None
            }
        }
    }
}

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn fence_pattern() -> &'static Regex {
    FENCE_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+\-]*)[ \t]*\r?\n?(.*?)```")
            .expect("Invalid fence pattern")
    })
}

/// Pull an HTML document out of a model reply.
///
/// Prefers a fenced block tagged `html`, then the first untagged fenced
/// block, then the raw text.
pub fn extract_html(text: &str) -> &str {
    if !text.contains("```") {
        return text;
    }

    let mut untagged = None;
    for caps in fence_pattern().captures_iter(text) {
        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = match caps.get(2) {
            Some(body) => body.as_str(),
            None => continue,
        };
        if lang.eq_ignore_ascii_case("html") {
            return body;
        }
        if lang.is_empty() && untagged.is_none() {
            untagged = Some(body);
        }
    }

    untagged.unwrap_or(text)
}

/// A document starts with `<!DOCTYPE` and contains `</html>`, both
/// case-insensitive.
pub fn is_acceptable_html(text: &str) -> bool {
    let lower = text.trim_start().to_ascii_lowercase();
    lower.starts_with("<!doctype") && lower.contains("</html>")
}
