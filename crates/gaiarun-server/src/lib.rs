//! gaiarun Server Library
//!
//! This crate runs GAIA benchmark tasks through the interpreter agent:
//! the task catalog, the runner that classifies answers, the run store,
//! the orchestration service with its HTTP API, and the offline
//! threaded benchmark.

pub mod benchmark;
pub mod catalog;
pub mod config;
pub mod http;
pub mod runner;
pub mod service;
pub mod state;
pub mod store;

pub use catalog::{DatasetLoader, JsonDatasetLoader, TaskCatalog};
pub use config::Cli;
pub use runner::{AgentTaskRunner, FakeTaskRunner, TaskRunner};
pub use service::{RunService, ServiceError};
pub use state::AppState;
pub use store::{FileRunStore, MemoryRunStore, TaskRunStore};
