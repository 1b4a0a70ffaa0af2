//! Run store: the durable history of every task run.
//!
//! Two backings implement [`TaskRunStore`]:
//! - [`MemoryRunStore`] for tests and ephemeral servers
//! - [`FileRunStore`] persisting the whole run map in one JSON file

mod file;
mod memory;

pub use file::FileRunStore;
pub use memory::MemoryRunStore;

use async_trait::async_trait;
use thiserror::Error;

use gaiarun_core::{RunConfiguration, RunId, Task, TaskId, TaskResult, TaskRun, TaskRunPreview};

/// Run store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The run id was never started.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// The run already holds a result.
    #[error("Run already finished: {0}")]
    AlreadyFinished(RunId),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store worker failed: {0}")]
    Join(String),
}

/// Durable record of task runs.
///
/// Runs are append-only: they are started, finished once, and never
/// deleted.
#[async_trait]
pub trait TaskRunStore: Send + Sync {
    /// Record a new running run for `task`.
    async fn start(&self, task: Task, command: RunConfiguration) -> Result<TaskRun, StoreError>;

    /// Record the result of a started run and return the updated run.
    async fn finish(&self, run_id: &RunId, result: TaskResult) -> Result<TaskRun, StoreError>;

    async fn get(&self, run_id: &RunId) -> Result<TaskRun, StoreError>;

    /// Previews of every run, in start order.
    async fn previews(&self) -> Result<Vec<TaskRunPreview>, StoreError>;

    /// Previews of the runs of one task, in start order.
    async fn runs_for_task(&self, task_id: &TaskId) -> Result<Vec<TaskRunPreview>, StoreError> {
        let previews = self.previews().await?;
        Ok(previews
            .into_iter()
            .filter(|p| &p.task.task_id == task_id)
            .collect())
    }
}
