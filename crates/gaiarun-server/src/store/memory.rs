//! In-memory run store.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::info;

use gaiarun_core::{RunConfiguration, RunId, Task, TaskResult, TaskRun, TaskRunPreview};

use super::{StoreError, TaskRunStore};

/// Run store keeping every run in an insertion-ordered map.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<IndexMap<RunId, TaskRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing runs, keeping their order.
    pub fn with_runs(runs: Vec<TaskRun>) -> Self {
        let runs = runs.into_iter().map(|run| (run.id.clone(), run)).collect();
        Self {
            runs: RwLock::new(runs),
        }
    }

    /// Seed the store from a JSON array of runs.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path.as_ref())?;
        let runs: Vec<TaskRun> = serde_json::from_str(&content)?;
        info!(runs = runs.len(), path = %path.as_ref().display(), "Seeded in-memory run store");
        Ok(Self::with_runs(runs))
    }
}

#[async_trait]
impl TaskRunStore for MemoryRunStore {
    async fn start(&self, task: Task, command: RunConfiguration) -> Result<TaskRun, StoreError> {
        let run = TaskRun::new(task, command);
        self.runs.write().await.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn finish(&self, run_id: &RunId, result: TaskResult) -> Result<TaskRun, StoreError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.clone()))?;
        run.finish(result)
            .map_err(|_| StoreError::AlreadyFinished(run_id.clone()))?;
        Ok(run.clone())
    }

    async fn get(&self, run_id: &RunId) -> Result<TaskRun, StoreError> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| StoreError::RunNotFound(run_id.clone()))
    }

    async fn previews(&self) -> Result<Vec<TaskRunPreview>, StoreError> {
        Ok(self.runs.read().await.values().map(TaskRun::to_preview).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_start_then_get() {
        contract::start_then_get_is_running(&MemoryRunStore::new()).await;
    }

    #[tokio::test]
    async fn test_finish_then_get() {
        contract::finish_then_get_has_result(&MemoryRunStore::new()).await;
    }

    #[tokio::test]
    async fn test_second_finish() {
        contract::second_finish_is_rejected(&MemoryRunStore::new()).await;
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        contract::unknown_ids_are_not_found(&MemoryRunStore::new()).await;
    }

    #[tokio::test]
    async fn test_previews() {
        contract::previews_count_every_start(&MemoryRunStore::new()).await;
    }

    #[tokio::test]
    async fn test_seeded_from_file() {
        let run = TaskRun::new(Task::new("t1", 1, "q", "a"), RunConfiguration::default());
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), serde_json::to_string(&vec![run.clone()]).unwrap()).unwrap();

        let store = MemoryRunStore::from_file(file.path()).unwrap();
        assert_eq!(store.get(&run.id).await.unwrap(), run);
        assert_eq!(store.previews().await.unwrap().len(), 1);
    }
}
