//! Command handlers for CLI operations
//!
//! - serve: start the worker and the HTTP server
//! - build: run one request file through the orchestrator
//! - show: print a stored task record
//! - preview: render template files locally

use anyhow::{Context, Result};
use api_server::{ApiServer, ApiState};
use sdk::{BuildRequest, EngineError, ErrorExt, SubmitHandle};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::generator::{template::TemplateKind, ContentGenerator};
use crate::llm::GeminiProvider;
use crate::notifier::Notifier;
use crate::orchestrator::{Orchestrator, RedeployWait, RoundOutcome};
use crate::publisher::GitHubPublisher;
use crate::queue::{JobQueue, Worker};
use crate::secrets::Secrets;
use crate::store::{JsonFileStore, TaskStore};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Follow-up line printed under a failed command
pub fn error_hint(err: &EngineError) -> String {
    let retry = if err.is_recoverable() {
        "retrying may succeed"
    } else {
        "retrying will not help until this is fixed"
    };
    format!("Hint: {} ({})", err.user_hint(), retry)
}

/// Print the hint for `err` to stderr and hand it on to the caller
pub fn hinted(err: impl Into<EngineError>) -> anyhow::Error {
    let err = err.into();
    eprintln!("{}", error_hint(&err));
    err.into()
}

/// Wire the production orchestrator from config and credentials
pub fn build_orchestrator(
    config: &Config,
    secrets: &Secrets,
    store: Arc<dyn TaskStore>,
) -> Orchestrator {
    // Without a key the provider reports itself unready and every round uses the template
    let generator = ContentGenerator::new(Arc::new(GeminiProvider::new(
        config.llm.gemini.clone(),
        secrets.gemini_api_key.clone(),
    )));

    let publisher = Arc::new(GitHubPublisher::new(&config.github, secrets.github.clone()));

    Orchestrator::new(
        generator,
        publisher,
        Notifier::from_config(&config.notifier),
        store,
    )
    .with_redeploy(RedeployWait::from(&config.orchestrator))
}

async fn open_store(config: &Config) -> Result<JsonFileStore> {
    let store = JsonFileStore::new(config.tasks_file());
    store
        .init()
        .await
        .with_context(|| format!("Failed to initialise task store at {}", store.path().display()))?;
    Ok(store)
}

/// Serve the HTTP API until Ctrl-C
pub async fn handle_serve(config: &Config, bind: Option<String>) -> Result<()> {
    let secrets = Secrets::from_env();
    secrets.log_presence();

    let store = open_store(config).await?;
    let orchestrator = Arc::new(build_orchestrator(config, &secrets, Arc::new(store)));

    let (queue, rx) = JobQueue::new(config.queue.capacity);
    let worker = tokio::spawn(Worker::new(orchestrator).run(rx));

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    let state = ApiState {
        submitter: SubmitHandle::new(Arc::new(queue)),
        secret: secrets.inbound_secret.clone(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let server = ApiServer::start(addr, state).await?;
    println!("Pagesmith listening on http://{}", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    // Dropping the router closes the queue; the worker then finishes running rounds
    server.shutdown().await;
    worker.await.context("Worker task failed")?;

    Ok(())
}

/// Run one request synchronously and print the outcome
pub async fn handle_build(request_path: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let contents = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("Failed to read {}", request_path.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&contents).context("Request file is not valid JSON")?;
    sdk::validation::validate_request(&payload).map_err(hinted)?;
    let request: BuildRequest =
        serde_json::from_value(payload).context("Request file does not match the request shape")?;

    let secrets = Secrets::from_env();
    secrets.log_presence();
    let store = open_store(config).await?;
    let orchestrator = build_orchestrator(config, &secrets, Arc::new(store));

    let outcome = orchestrator.execute(&request).await.map_err(hinted)?;
    print_outcome(&outcome, format)
}

fn print_outcome(outcome: &RoundOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Task {} round {} completed", outcome.task, outcome.round);
            println!("  Repository: {}", outcome.repo_url);
            println!("  Pages:      {}", outcome.pages_url);
            println!("  Commit:     {}", outcome.commit_sha);
            println!("  Source:     {:?}", outcome.source);
            println!(
                "  Notified:   {} after {} attempt(s)",
                outcome.notification.delivered, outcome.notification.attempts
            );
        }
        OutputFormat::Json => {
            let states: Vec<&str> = outcome.states.iter().map(|s| s.as_str()).collect();
            let output = json!({
                "task": outcome.task,
                "round": outcome.round,
                "repo_name": outcome.repo_name,
                "repo_url": outcome.repo_url,
                "pages_url": outcome.pages_url,
                "commit_sha": outcome.commit_sha,
                "source": format!("{:?}", outcome.source).to_lowercase(),
                "notified": outcome.notification.delivered,
                "notify_attempts": outcome.notification.attempts,
                "states": states,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Print the stored record of a task
pub async fn handle_show(task: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let store = JsonFileStore::new(config.tasks_file());
    let record = store
        .get(task)
        .await
        .map_err(hinted)?
        .with_context(|| format!("No record found for task: {}", task))?;

    match format {
        OutputFormat::Text => {
            println!("Task: {}", task);
            println!("  Email:      {}", record.email);
            println!("  Repository: {}", record.repo_url);
            println!("  Pages:      {}", record.pages_url);
            println!("  Commit:     {}", record.commit_sha);
            println!("  Round 1:    {} ({})", record.round1.timestamp, record.round1.nonce);
            println!("    Brief:    {}", record.round1.brief);
            for check in &record.round1.checks {
                println!("    - {}", check);
            }
            if let Some(round2) = &record.round2 {
                println!("  Round 2:    {} ({})", round2.timestamp, round2.nonce);
                println!("    Brief:    {}", round2.brief);
                println!("    Commit:   {}", round2.commit_sha);
                for check in &round2.checks {
                    println!("    - {}", check);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

/// Render the fallback files for a brief and optionally write them out
pub async fn handle_preview(
    brief: &str,
    checks: &[String],
    out: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let generated = ContentGenerator::template_only()
        .generate(brief, checks, &[])
        .await;
    let kind = TemplateKind::classify(brief);

    let written = match &out {
        Some(dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let mut written = Vec::new();
            for (path, content) in generated.files.iter() {
                let target = dir.join(path);
                tokio::fs::write(&target, content)
                    .await
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                written.push(target);
            }
            written
        }
        None => Vec::new(),
    };

    match format {
        OutputFormat::Text => {
            if out.is_some() {
                println!("Template: {}", kind.label());
                for path in &written {
                    println!("  wrote {}", path.display());
                }
            } else if let Some(index) = generated.files.get(crate::generator::INDEX_FILE) {
                println!("{}", index);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "template": kind.label(),
                "files": generated.files,
                "written": written,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preview_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("site");

        handle_preview(
            "Render markdown notes",
            &["Has #markdown-output".to_string()],
            Some(out.clone()),
            OutputFormat::Json,
        )
        .await
        .unwrap();

        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("markdown-output"));
        assert!(out.join("README.md").exists());
        assert!(out.join("LICENSE").exists());
    }

    #[test]
    fn test_error_hint_says_whether_to_retry() {
        let hint = error_hint(&EngineError::NoPriorRound("sales".into()));
        assert_eq!(
            hint,
            "Hint: Submit round 1 for this task before round 2 (retrying will not help until this is fixed)"
        );

        let hint = error_hint(&EngineError::Publish("502 Bad Gateway".into()));
        assert!(hint.starts_with("Hint: Repository hosting failed"));
        assert!(hint.ends_with("(retrying may succeed)"));
    }

    #[tokio::test]
    async fn test_build_without_prior_round_reports_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.core.data_dir = dir.path().to_path_buf();

        let request = dir.path().join("round2.json");
        std::fs::write(
            &request,
            serde_json::json!({
                "email": "student@example.com",
                "secret": "s",
                "task": "never-built",
                "round": 2,
                "nonce": "n",
                "brief": "Add a footer",
                "checks": [],
                "evaluation_url": "http://127.0.0.1:9/notify"
            })
            .to_string(),
        )
        .unwrap();

        let err = handle_build(&request, &config, OutputFormat::Text)
            .await
            .unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert!(matches!(engine, EngineError::NoPriorRound(task) if task == "never-built"));
        assert!(!engine.is_recoverable());
    }

    #[tokio::test]
    async fn test_show_unknown_task_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.core.data_dir = dir.path().to_path_buf();

        let err = handle_show("missing", &config, OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
