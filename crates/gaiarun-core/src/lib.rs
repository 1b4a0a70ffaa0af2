//! gaiarun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - The run store backings
//! - Runtime specifics
//!
//! All types here represent the benchmark domain: tasks, run
//! configurations, runs and their classified results.

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod result;
pub mod run;
pub mod status;
pub mod task;
pub mod transcript;

// Re-export commonly used types
pub use config::RunConfiguration;
pub use error::CoreError;
pub use event::TaskUpdate;
pub use ids::{RunId, TaskId};
pub use result::TaskResult;
pub use run::{TaskRun, TaskRunPreview, TaskRunRequest};
pub use status::ResultStatus;
pub use task::{AnnotatorMetadata, Task, TaskPreview};
pub use transcript::{Message, Role, Transcript};
