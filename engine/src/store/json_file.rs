use super::{StoreError, TaskRecord, TaskStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Records = BTreeMap<String, TaskRecord>;

/// Task store backed by one JSON object file keyed by task id
///
/// Every `put` rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the parent directory and an empty `{}` file if none exists
    pub async fn init(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&self.path).await? {
            write_atomic_json(&self.path, &Records::new()).await?;
            tracing::info!(path = %self.path.display(), "Initialized task store");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load: a missing file is empty, an unparsable one is an error
    async fn load(&self) -> Result<Records, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        if text.trim().is_empty() {
            return Ok(Records::new());
        }

        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Lenient load for reads: anything unreadable is an empty store
    async fn load_for_read(&self) -> Records {
        match self.load().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Task store unreadable, treating as empty");
                Records::new()
            }
        }
    }
}

async fn write_atomic_json(path: &Path, records: &Records) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(dir).await?;
    let tmp = path.with_extension("json.tmp");
    let text =
        serde_json::to_string_pretty(records).map_err(|e| StoreError::Serialize(e.to_string()))?;
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn get(&self, task: &str) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.load_for_read().await.remove(task))
    }

    async fn put(&self, task: &str, record: TaskRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        // Refuse to overwrite a file we could not parse
        let mut records = self.load().await?;
        records.insert(task.to_string(), record);
        write_atomic_json(&self.path, &records).await?;

        tracing::debug!(task, path = %self.path.display(), "Persisted task record");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load_for_read().await.into_keys().collect())
    }
}
