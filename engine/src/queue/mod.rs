//! Background job queue
//!
//! The API hands accepted requests to a [`JobQueue`] and answers right away.
//! A single [`Worker`] drains the queue and runs each round on its own task.
//! Rounds for the same task id run one at a time; different tasks run
//! concurrently.

use crate::orchestrator::Orchestrator;
use sdk::{BuildRequest, BuildSubmitter, EngineError};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio::task::JoinSet;
use tracing::Instrument;

/// Sending side of the job channel
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<BuildRequest>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending jobs
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BuildRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Fails when the queue is full or the worker is gone.
    pub fn enqueue(&self, request: BuildRequest) -> Result<(), EngineError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EngineError::Queue("Job queue is full".to_string()),
            mpsc::error::TrySendError::Closed(_) => {
                EngineError::Queue("Job queue is closed".to_string())
            }
        })
    }
}

impl BuildSubmitter for JobQueue {
    fn submit(&self, request: BuildRequest) -> Result<(), EngineError> {
        self.enqueue(request)
    }
}

type LockMap = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Per-task mutual exclusion. An entry lives only while a round of its task
/// is running or waiting.
#[derive(Default, Clone)]
pub struct TaskLocks {
    locks: LockMap,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other round of `task` is running
    pub async fn acquire(&self, task: &str) -> TaskGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(task.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;

        TaskGuard {
            task: task.to_string(),
            lock,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held for the duration of one round
pub struct TaskGuard {
    task: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters clone the entry under the map lock, so the count is stable here.
        // Two references left means the map and this guard.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.task);
        }
    }
}

/// Drains the job channel into the orchestrator
pub struct Worker {
    orchestrator: Arc<Orchestrator>,
    locks: TaskLocks,
}

impl Worker {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            locks: TaskLocks::new(),
        }
    }

    /// Run until every sender is dropped, then wait for in-flight rounds
    pub async fn run(self, mut rx: mpsc::Receiver<BuildRequest>) {
        let mut jobs = JoinSet::new();

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(request) = received else { break };
                    let span = tracing::info_span!(
                        "build",
                        task = %request.task,
                        round = %request.round
                    );
                    let orchestrator = Arc::clone(&self.orchestrator);
                    let locks = self.locks.clone();
                    jobs.spawn(
                        async move {
                            let _guard = locks.acquire(&request.task).await;
                            orchestrator.process(&request).await;
                        }
                        .instrument(span),
                    );
                }
                Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Build job panicked");
                    }
                }
            }
        }

        tracing::info!(pending = jobs.len(), "Job queue closed, waiting for running builds");
        while let Some(joined) = jobs.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Build job panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::Round;
    use std::time::Duration;

    fn request(task: &str) -> BuildRequest {
        BuildRequest {
            email: "a@b.co".into(),
            secret: "s".into(),
            task: task.into(),
            round: Round::Create,
            nonce: "n".into(),
            brief: "b".into(),
            checks: vec![],
            evaluation_url: "http://localhost/cb".into(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_queue() {
        let (queue, mut rx) = JobQueue::new(1);
        queue.enqueue(request("one")).unwrap();

        let err = queue.enqueue(request("two")).unwrap_err();
        assert!(matches!(err, EngineError::Queue(_)));
        assert_eq!(err.status_code(), 503);

        assert_eq!(rx.recv().await.unwrap().task, "one");
    }

    #[tokio::test]
    async fn test_enqueue_reports_closed_queue() {
        let (queue, rx) = JobQueue::new(4);
        drop(rx);
        assert!(matches!(queue.submit(request("t")), Err(EngineError::Queue(_))));
    }

    #[tokio::test]
    async fn test_task_locks_serialize_same_task() {
        let locks = TaskLocks::new();
        let guard = locks.acquire("t").await;

        let other = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = other.acquire("t").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        // A different task is not blocked
        let _unrelated = locks.acquire("u").await;

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_task_locks_forget_finished_tasks() {
        let locks = TaskLocks::new();

        for task in ["a", "b", "c"] {
            let _guard = locks.acquire(task).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_task_lock_kept_while_a_round_waits() {
        let locks = TaskLocks::new();
        let first = locks.acquire("t").await;

        let other = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = other.acquire("t").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.tracked(), 1);

        waiting.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
