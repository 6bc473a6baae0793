//! Round sequencing against recording fakes

use async_trait::async_trait;
use pagesmith_engine::generator::{ContentGenerator, GenerationSource, INDEX_FILE, LICENSE_FILE, README_FILE};
use pagesmith_engine::llm::{LLMError, LLMProvider};
use pagesmith_engine::notifier::{Notifier, RetryPolicy, WebhookTransport};
use pagesmith_engine::orchestrator::{
    Orchestrator, PublishStage, RedeployWait, TaskErrorKind, TaskState,
};
use pagesmith_engine::publisher::{PublishError, Publisher};
use pagesmith_engine::store::{MemoryStore, TaskStore};
use sdk::{BuildRequest, FileSet, NotificationPayload, Round};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(String),
    Publish(String, Vec<String>),
    PublishOrInit(String, Vec<String>),
    EnableHosting(String),
    WaitForPages(String),
}

#[derive(Default)]
struct FakePublisher {
    calls: Mutex<Vec<Call>>,
    fail_commit: bool,
    commits: Mutex<u32>,
}

impl FakePublisher {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_sha(&self) -> String {
        let mut commits = self.commits.lock().unwrap();
        *commits += 1;
        format!("sha-{}", commits)
    }
}

fn paths(files: &FileSet) -> Vec<String> {
    files.paths().into_iter().map(str::to_string).collect()
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn create_repository(&self, name: &str) -> Result<String, PublishError> {
        self.record(Call::Create(name.to_string()));
        Ok(format!("https://github.com/octo/{}", name))
    }

    async fn publish(&self, repo: &str, files: &FileSet) -> Result<String, PublishError> {
        self.record(Call::Publish(repo.to_string(), paths(files)));
        if self.fail_commit {
            return Err(PublishError::BranchNotReady {
                attempts: 5,
                last: "404".into(),
            });
        }
        Ok(self.next_sha())
    }

    async fn publish_or_init(&self, repo: &str, files: &FileSet) -> Result<String, PublishError> {
        self.record(Call::PublishOrInit(repo.to_string(), paths(files)));
        Ok(self.next_sha())
    }

    async fn enable_hosting(&self, repo: &str) -> Result<String, PublishError> {
        self.record(Call::EnableHosting(repo.to_string()));
        self.pages_url(repo)
    }

    fn pages_url(&self, repo: &str) -> Result<String, PublishError> {
        Ok(format!("https://octo.github.io/{}/", repo))
    }

    async fn wait_for_pages(&self, url: &str) -> bool {
        self.record(Call::WaitForPages(url.to_string()));
        true
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<(String, NotificationPayload)>>);

#[async_trait]
impl WebhookTransport for Inbox {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        self.0.lock().unwrap().push((url.to_string(), payload.clone()));
        Ok(200)
    }
}

struct TimesOut;

#[async_trait]
impl LLMProvider for TimesOut {
    fn name(&self) -> &str {
        "times-out"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LLMError> {
        Err(LLMError::Timeout)
    }
}

struct Harness {
    orchestrator: Orchestrator,
    publisher: Arc<FakePublisher>,
    inbox: Arc<Inbox>,
    store: Arc<MemoryStore>,
}

fn harness(publisher: FakePublisher) -> Harness {
    let publisher = Arc::new(publisher);
    let inbox = Arc::new(Inbox::default());
    let store = Arc::new(MemoryStore::new());

    let orchestrator = Orchestrator::new(
        ContentGenerator::new(Arc::new(TimesOut)),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        Notifier::new(Arc::clone(&inbox) as Arc<dyn WebhookTransport>, RetryPolicy::default()),
        Arc::clone(&store) as Arc<dyn TaskStore>,
    )
    .with_redeploy(RedeployWait::Sleep(Duration::ZERO));

    Harness {
        orchestrator,
        publisher,
        inbox,
        store,
    }
}

fn request(task: &str, round: Round, brief: &str, checks: &[&str]) -> BuildRequest {
    BuildRequest {
        email: "student@example.com".into(),
        secret: "s".into(),
        task: task.into(),
        round,
        nonce: format!("nonce-{}", round),
        brief: brief.into(),
        checks: checks.iter().map(|c| c.to_string()).collect(),
        evaluation_url: "https://eval.example.com/notify".into(),
        attachments: vec![],
    }
}

#[tokio::test]
async fn test_round_one_hello_world() {
    let h = harness(FakePublisher::default());
    let req = request(
        "hello",
        Round::Create,
        "Create a Hello World page showing today's date",
        &["Page has h1#hello"],
    );

    let outcome = h.orchestrator.execute(&req).await.unwrap();

    assert_eq!(outcome.source, GenerationSource::Template);
    assert!(outcome.repo_name.starts_with("hello-"));
    assert_eq!(outcome.commit_sha, "sha-1");
    assert_eq!(
        outcome.states,
        vec![
            TaskState::Received,
            TaskState::Generating,
            TaskState::Publishing,
            TaskState::HostingEnabled,
            TaskState::Persisted,
            TaskState::Notified,
            TaskState::Completed,
        ]
    );

    let calls = h.publisher.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], Call::Create(outcome.repo_name.clone()));
    assert_eq!(
        calls[1],
        Call::Publish(
            outcome.repo_name.clone(),
            vec![LICENSE_FILE.to_string(), README_FILE.to_string(), INDEX_FILE.to_string()]
        )
    );
    assert_eq!(calls[2], Call::EnableHosting(outcome.repo_name.clone()));

    let record = h.store.get("hello").await.unwrap().unwrap();
    assert_eq!(record.round1.checks, vec!["Page has h1#hello"]);
    assert_eq!(record.pages_url, outcome.pages_url);
    assert!(record.round2.is_none());

    let inbox = h.inbox.0.lock().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].0, "https://eval.example.com/notify");
    assert_eq!(inbox[0].1.round, Round::Create);
    assert_eq!(inbox[0].1.commit_sha, "sha-1");
    assert_eq!(inbox[0].1.nonce, "nonce-1");
}

#[tokio::test]
async fn test_round_two_unknown_task_has_no_side_effects() {
    let h = harness(FakePublisher::default());
    let req = request("ghost", Round::Update, "Add a footer", &[]);

    let err = h.orchestrator.execute(&req).await.unwrap_err();

    assert_eq!(err.kind(), TaskErrorKind::NoPriorRound);
    assert_eq!(err.to_string(), "No round 1 info found for task: ghost");
    assert!(h.publisher.calls().is_empty());
    assert!(h.inbox.0.lock().unwrap().is_empty());
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_round_two_updates_existing_repository() {
    let h = harness(FakePublisher::default());
    let first = h
        .orchestrator
        .execute(&request("sales", Round::Create, "Show sales data", &["old"]))
        .await
        .unwrap();

    let second = h
        .orchestrator
        .execute(&request("sales", Round::Update, "Add a chart", &["new"]))
        .await
        .unwrap();

    assert_eq!(second.repo_url, first.repo_url);
    assert_eq!(second.pages_url, first.pages_url);
    assert_eq!(second.commit_sha, "sha-2");
    assert!(!second.states.contains(&TaskState::HostingEnabled));

    let calls = h.publisher.calls();
    assert_eq!(
        calls.last().unwrap(),
        &Call::PublishOrInit(
            first.repo_name.clone(),
            vec![README_FILE.to_string(), INDEX_FILE.to_string()]
        )
    );

    let record = h.store.get("sales").await.unwrap().unwrap();
    let round2 = record.round2.unwrap();
    assert_eq!(round2.commit_sha, "sha-2");
    assert_eq!(round2.checks, vec!["new"]);
    assert_eq!(record.commit_sha, "sha-1");

    let inbox = h.inbox.0.lock().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[1].1.round, Round::Update);
    assert_eq!(inbox[1].1.repo_url, first.repo_url);
    assert_eq!(inbox[1].1.commit_sha, "sha-2");
}

#[tokio::test]
async fn test_commit_failure_stops_round() {
    let h = harness(FakePublisher {
        fail_commit: true,
        ..FakePublisher::default()
    });

    let err = h
        .orchestrator
        .execute(&request("broken", Round::Create, "Anything", &[]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TaskErrorKind::Publish(PublishStage::Commit));
    assert!(err.to_string().contains("Repository not ready after 5 attempts"));

    let calls = h.publisher.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls.iter().any(|c| matches!(c, Call::EnableHosting(_))));
    assert!(h.store.get("broken").await.unwrap().is_none());
    assert!(h.inbox.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_redeploy_probes_existing_site() {
    let h = harness(FakePublisher::default());
    let orchestrator = Orchestrator::new(
        ContentGenerator::template_only(),
        Arc::clone(&h.publisher) as Arc<dyn Publisher>,
        Notifier::new(Arc::clone(&h.inbox) as Arc<dyn WebhookTransport>, RetryPolicy::default()),
        Arc::clone(&h.store) as Arc<dyn TaskStore>,
    )
    .with_redeploy(RedeployWait::Poll);

    let first = orchestrator
        .execute(&request("poll", Round::Create, "Hello", &[]))
        .await
        .unwrap();
    orchestrator
        .execute(&request("poll", Round::Update, "Hello again", &[]))
        .await
        .unwrap();

    assert!(h
        .publisher
        .calls()
        .contains(&Call::WaitForPages(first.pages_url)));
}

#[tokio::test(start_paused = true)]
async fn test_default_redeploy_sleeps_thirty_seconds() {
    let h = harness(FakePublisher::default());
    let orchestrator = Orchestrator::new(
        ContentGenerator::template_only(),
        Arc::clone(&h.publisher) as Arc<dyn Publisher>,
        Notifier::new(Arc::clone(&h.inbox) as Arc<dyn WebhookTransport>, RetryPolicy::default()),
        Arc::clone(&h.store) as Arc<dyn TaskStore>,
    );

    orchestrator
        .execute(&request("wait", Round::Create, "Hello", &[]))
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    orchestrator
        .execute(&request("wait", Round::Update, "Hello again", &[]))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(30));
}
