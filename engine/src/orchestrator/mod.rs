//! Round sequencing
//!
//! Runs one build request end to end:
//!
//! ```text
//! round 1: received -> generating -> publishing -> hosting-enabled -> persisted -> notified -> completed
//! round 2: received -> generating -> publishing -> persisted -> notified -> completed
//! ```
//!
//! Any step that fails moves the round to `failed` and skips the remaining
//! steps; whatever was already created on GitHub is left in place. Errors
//! are returned as a structured [`TaskError`] from [`Orchestrator::execute`]
//! and only turned into log lines at [`Orchestrator::process`].

use crate::config::{OrchestratorConfig, RedeployMode};
use crate::generator::{ContentGenerator, GenerationSource, PriorRound};
use crate::notifier::{Notifier, NotifyOutcome};
use crate::publisher::{PublishError, Publisher};
use crate::store::{record_timestamp, RoundOneInfo, RoundTwoInfo, StoreError, TaskRecord, TaskStore};
use chrono::Utc;
use sdk::{BuildRequest, EngineError, NotificationPayload, Round};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Progress of one (task, round) execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Received,
    Generating,
    Publishing,
    HostingEnabled,
    Persisted,
    Notified,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Received => "received",
            TaskState::Generating => "generating",
            TaskState::Publishing => "publishing",
            TaskState::HostingEnabled => "hosting-enabled",
            TaskState::Persisted => "persisted",
            TaskState::Notified => "notified",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishing step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    CreateRepository,
    Commit,
    EnableHosting,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PublishStage::CreateRepository => "create repository",
            PublishStage::Commit => "commit",
            PublishStage::EnableHosting => "enable hosting",
        })
    }
}

/// Why a round stopped
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("No round 1 info found for task: {0}")]
    NoPriorRound(String),

    #[error("{stage} failed: {source}")]
    Publish {
        stage: PublishStage,
        #[source]
        source: PublishError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Discriminant of [`TaskError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskErrorKind {
    NoPriorRound,
    Publish(PublishStage),
    Store,
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            TaskError::NoPriorRound(_) => TaskErrorKind::NoPriorRound,
            TaskError::Publish { stage, .. } => TaskErrorKind::Publish(*stage),
            TaskError::Store(_) => TaskErrorKind::Store,
        }
    }
}

impl From<TaskError> for EngineError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NoPriorRound(task) => EngineError::NoPriorRound(task),
            TaskError::Publish { .. } => EngineError::Publish(err.to_string()),
            TaskError::Store(e) => e.into(),
        }
    }
}

fn at(stage: PublishStage) -> impl FnOnce(PublishError) -> TaskError {
    move |source| TaskError::Publish { stage, source }
}

/// How round 2 waits for the site to pick up the new commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeployWait {
    Sleep(Duration),
    Poll,
}

impl From<&OrchestratorConfig> for RedeployWait {
    fn from(config: &OrchestratorConfig) -> Self {
        match config.redeploy_mode {
            RedeployMode::Sleep => RedeployWait::Sleep(Duration::from_secs(config.redeploy_settle_secs)),
            RedeployMode::Poll => RedeployWait::Poll,
        }
    }
}

/// Summary of a completed round
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub task: String,
    pub round: Round,
    pub repo_name: String,
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub source: GenerationSource,
    pub notification: NotifyOutcome,
    pub states: Vec<TaskState>,
}

/// Logged state trail of one execution
struct Trail {
    task: String,
    round: Round,
    states: Vec<TaskState>,
}

impl Trail {
    fn new(request: &BuildRequest) -> Self {
        let mut trail = Self {
            task: request.task.clone(),
            round: request.round,
            states: Vec::new(),
        };
        trail.enter(TaskState::Received);
        trail
    }

    fn enter(&mut self, state: TaskState) {
        tracing::info!(task = %self.task, round = %self.round, state = %state, "Round state changed");
        self.states.push(state);
    }
}

/// Sequences generator, publisher, store and notifier for one request
pub struct Orchestrator {
    generator: ContentGenerator,
    publisher: Arc<dyn Publisher>,
    notifier: Notifier,
    store: Arc<dyn TaskStore>,
    redeploy: RedeployWait,
}

impl Orchestrator {
    pub fn new(
        generator: ContentGenerator,
        publisher: Arc<dyn Publisher>,
        notifier: Notifier,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            generator,
            publisher,
            notifier,
            store,
            redeploy: RedeployWait::Sleep(Duration::from_secs(30)),
        }
    }

    pub fn with_redeploy(mut self, redeploy: RedeployWait) -> Self {
        self.redeploy = redeploy;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Run a round and log its failure. Used by the background worker.
    pub async fn process(&self, request: &BuildRequest) {
        if let Err(e) = self.execute(request).await {
            tracing::error!(
                task = %request.task,
                round = %request.round,
                error = %e,
                "Round failed"
            );
        }
    }

    /// Run a round and return its outcome or the error that stopped it
    pub async fn execute(&self, request: &BuildRequest) -> Result<RoundOutcome, TaskError> {
        let mut trail = Trail::new(request);

        let result = match request.round {
            Round::Create => self.create_round(request, &mut trail).await,
            Round::Update => self.update_round(request, &mut trail).await,
        };

        match result {
            Ok(mut outcome) => {
                trail.enter(TaskState::Completed);
                outcome.states = trail.states;
                Ok(outcome)
            }
            Err(e) => {
                trail.enter(TaskState::Failed);
                Err(e)
            }
        }
    }

    async fn create_round(&self, request: &BuildRequest, trail: &mut Trail) -> Result<RoundOutcome, TaskError> {
        trail.enter(TaskState::Generating);
        let generated = self
            .generator
            .generate(&request.brief, &request.checks, &request.attachments)
            .await;
        tracing::info!(task = %request.task, source = ?generated.source, files = generated.files.len(), "Generated files");

        trail.enter(TaskState::Publishing);
        let repo_name = format!("{}-{}", request.task, Utc::now().timestamp());
        let repo_url = self
            .publisher
            .create_repository(&repo_name)
            .await
            .map_err(at(PublishStage::CreateRepository))?;
        let commit_sha = self
            .publisher
            .publish(&repo_name, &generated.files)
            .await
            .map_err(at(PublishStage::Commit))?;
        let pages_url = self
            .publisher
            .enable_hosting(&repo_name)
            .await
            .map_err(at(PublishStage::EnableHosting))?;
        trail.enter(TaskState::HostingEnabled);

        let record = TaskRecord {
            email: request.email.clone(),
            repo_name: repo_name.clone(),
            repo_url: repo_url.clone(),
            pages_url: pages_url.clone(),
            commit_sha: commit_sha.clone(),
            round1: RoundOneInfo {
                brief: request.brief.clone(),
                checks: request.checks.clone(),
                nonce: request.nonce.clone(),
                timestamp: record_timestamp(Utc::now()),
            },
            round2: None,
        };
        self.store.put(&request.task, record).await?;
        trail.enter(TaskState::Persisted);

        let notification = self
            .notifier
            .notify(
                &request.evaluation_url,
                &payload(request, &repo_url, &commit_sha, &pages_url),
            )
            .await;
        trail.enter(TaskState::Notified);

        Ok(RoundOutcome {
            task: request.task.clone(),
            round: request.round,
            repo_name,
            repo_url,
            pages_url,
            commit_sha,
            source: generated.source,
            notification,
            states: Vec::new(),
        })
    }

    async fn update_round(&self, request: &BuildRequest, trail: &mut Trail) -> Result<RoundOutcome, TaskError> {
        let mut record = self
            .store
            .get(&request.task)
            .await?
            .ok_or_else(|| TaskError::NoPriorRound(request.task.clone()))?;

        trail.enter(TaskState::Generating);
        let prior = PriorRound {
            brief: record.round1.brief.clone(),
            checks: record.round1.checks.clone(),
        };
        let generated = self
            .generator
            .generate_update(&prior, &request.brief, &request.checks, &request.attachments)
            .await;
        tracing::info!(task = %request.task, source = ?generated.source, files = generated.files.len(), "Generated update");

        trail.enter(TaskState::Publishing);
        let commit_sha = self
            .publisher
            .publish_or_init(&record.repo_name, &generated.files)
            .await
            .map_err(at(PublishStage::Commit))?;

        match self.redeploy {
            RedeployWait::Sleep(delay) => {
                tracing::debug!(
                    task = %request.task,
                    secs = delay.as_secs(),
                    "Sleeping for redeploy instead of polling the site"
                );
                tokio::time::sleep(delay).await;
            }
            RedeployWait::Poll => {
                if !self.publisher.wait_for_pages(&record.pages_url).await {
                    tracing::warn!(url = %record.pages_url, "Site did not answer after redeploy");
                }
            }
        }

        record.round2 = Some(RoundTwoInfo {
            brief: request.brief.clone(),
            checks: request.checks.clone(),
            nonce: request.nonce.clone(),
            commit_sha: commit_sha.clone(),
            timestamp: record_timestamp(Utc::now()),
        });
        self.store.put(&request.task, record.clone()).await?;
        trail.enter(TaskState::Persisted);

        let notification = self
            .notifier
            .notify(
                &request.evaluation_url,
                &payload(request, &record.repo_url, &commit_sha, &record.pages_url),
            )
            .await;
        trail.enter(TaskState::Notified);

        Ok(RoundOutcome {
            task: request.task.clone(),
            round: request.round,
            repo_name: record.repo_name,
            repo_url: record.repo_url,
            pages_url: record.pages_url,
            commit_sha,
            source: generated.source,
            notification,
            states: Vec::new(),
        })
    }
}

fn payload(request: &BuildRequest, repo_url: &str, commit_sha: &str, pages_url: &str) -> NotificationPayload {
    NotificationPayload {
        email: request.email.clone(),
        task: request.task.clone(),
        round: request.round,
        nonce: request.nonce.clone(),
        repo_url: repo_url.to_string(),
        commit_sha: commit_sha.to_string(),
        pages_url: pages_url.to_string(),
    }
}
