//! Task persistence
//!
//! One [`TaskRecord`] per task id, created when round 1 completes and
//! extended with `round2` when round 2 completes. Records are never deleted.
//! The orchestrator is the only writer.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::EngineError;
use serde::{Deserialize, Serialize};

/// Persisted state of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub email: String,
    pub repo_name: String,
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub round1: RoundOneInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round2: Option<RoundTwoInfo>,
}

/// What round 1 was asked to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOneInfo {
    pub brief: String,
    pub checks: Vec<String>,
    pub nonce: String,
    pub timestamp: String,
}

/// What round 2 was asked to change, and the commit it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTwoInfo {
    pub brief: String,
    pub checks: Vec<String>,
    pub nonce: String,
    pub commit_sha: String,
    pub timestamp: String,
}

/// Errors raised by task stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Task store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task store file {path} is not valid JSON: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Failed to serialize task store: {0}")]
    Serialize(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store(err.to_string())
    }
}

/// Keyed task record storage
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Record for `task`, `None` if it was never completed
    async fn get(&self, task: &str) -> Result<Option<TaskRecord>, StoreError>;

    /// Insert or replace the record for `task`
    async fn put(&self, task: &str, record: TaskRecord) -> Result<(), StoreError>;

    /// All known task ids, sorted
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// UTC timestamp in the `2024-01-31T12:00:00Z` form used in records
pub fn record_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record() -> TaskRecord {
        TaskRecord {
            email: "a@b.co".into(),
            repo_name: "hello-1700000000".into(),
            repo_url: "https://github.com/o/hello-1700000000".into(),
            pages_url: "https://o.github.io/hello-1700000000/".into(),
            commit_sha: "abc".into(),
            round1: RoundOneInfo {
                brief: "b".into(),
                checks: vec!["c".into()],
                nonce: "n".into(),
                timestamp: "2024-01-31T12:00:00Z".into(),
            },
            round2: None,
        }
    }

    #[test]
    fn test_record_uses_camel_case_keys() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["repoName"], json!("hello-1700000000"));
        assert_eq!(value["pagesUrl"], json!("https://o.github.io/hello-1700000000/"));
        assert_eq!(value["round1"]["nonce"], json!("n"));
        assert!(value.get("round2").is_none());
    }

    #[test]
    fn test_round_two_commit_key() {
        let mut record = record();
        record.round2 = Some(RoundTwoInfo {
            brief: "b2".into(),
            checks: vec![],
            nonce: "n2".into(),
            commit_sha: "def".into(),
            timestamp: "2024-02-01T00:00:00Z".into(),
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["round2"]["commitSha"], json!("def"));
    }

    #[test]
    fn test_record_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 5).unwrap();
        assert_eq!(record_timestamp(now), "2024-01-31T12:00:05Z");
    }
}
