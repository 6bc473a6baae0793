use super::{StoreError, TaskRecord, TaskStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process task store
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get(&self, task: &str) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.records.read().await.get(task).cloned())
    }

    async fn put(&self, task: &str, record: TaskRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(task.to_string(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}
