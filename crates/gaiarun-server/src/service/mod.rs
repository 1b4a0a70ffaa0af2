//! Orchestration over the catalog, runner and run store.

pub mod run_service;

pub use run_service::RunService;

use thiserror::Error;

use gaiarun_core::{RunId, TaskId};

use crate::runner::RunnerError;
use crate::store::StoreError;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    #[error("Run already finished: {0}")]
    AlreadyFinished(RunId),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Run task aborted: {0}")]
    Aborted(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNotFound(id) => Self::RunNotFound(id),
            StoreError::AlreadyFinished(id) => Self::AlreadyFinished(id),
            other => Self::Store(other),
        }
    }
}
