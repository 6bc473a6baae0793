//! Build request, file set and notification types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Generation round
///
/// Round 1 creates the application and its repository, round 2 amends it.
/// Serialized as the bare integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    Create,
    Update,
}

impl Round {
    pub fn number(self) -> u8 {
        match self {
            Round::Create => 1,
            Round::Update => 2,
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::Create),
            2 => Ok(Round::Update),
            other => Err(format!("round must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> Self {
        round.number()
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A file attached to a build request
///
/// `url` is either a `data:` URI or a plain URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default = "default_attachment_name")]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

fn default_attachment_name() -> String {
    "file".to_string()
}

/// A validated inbound build request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: Round,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Set of text files committed together, keyed by relative path
///
/// Backed by a sorted map so iteration order (and therefore blob creation
/// order) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet(BTreeMap<String, String>);

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.0.insert(path.into(), content.into());
    }

    pub fn with(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Payload posted to the evaluation URL once per successful round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: Round,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Immediate acknowledgment returned to the caller before background work starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub status: String,
    pub task: String,
    pub round: Round,
    pub timestamp: String,
}

impl Acknowledgment {
    pub fn accepted(task: impl Into<String>, round: Round, timestamp: impl Into<String>) -> Self {
        Self {
            status: "accepted".to_string(),
            task: task.into(),
            round,
            timestamp: timestamp.into(),
        }
    }
}
