//! Core domain errors.

use thiserror::Error;

use crate::{RunId, TaskId};

/// Core domain errors for gaiarun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task not found in the catalog.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Run not found in the store.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// The run already holds a result.
    #[error("Run already finished: {0}")]
    AlreadyFinished(RunId),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
