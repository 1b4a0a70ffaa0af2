//! Read-only task catalog.
//!
//! Tasks are loaded once at startup from a [`DatasetLoader`] and never
//! modified afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use gaiarun_core::{Task, TaskId, TaskPreview};

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read dataset '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid dataset record at line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Duplicate task id in dataset: {0}")]
    DuplicateTask(TaskId),
}

/// Source of raw task records.
pub trait DatasetLoader {
    fn load(&self) -> Result<Vec<Task>, CatalogError>;
}

/// Loads a JSON array file, or a JSON Lines file when the extension is
/// `.jsonl`.
pub struct JsonDatasetLoader {
    path: PathBuf,
}

impl JsonDatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json_lines(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "jsonl")
    }
}

impl DatasetLoader for JsonDatasetLoader {
    fn load(&self) -> Result<Vec<Task>, CatalogError> {
        let content = fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.clone(),
            source,
        })?;

        if !Self::is_json_lines(&self.path) {
            return serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                line: source.line(),
                source,
            });
        }

        let mut tasks = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let task = serde_json::from_str(line).map_err(|source| CatalogError::Parse {
                line: idx + 1,
                source,
            })?;
            tasks.push(task);
        }
        Ok(tasks)
    }
}

/// In-memory, read-only collection of benchmark tasks.
#[derive(Debug, Default)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskCatalog {
    /// Build a catalog, preserving dataset order.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (pos, task) in tasks.iter().enumerate() {
            if index.insert(task.task_id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateTask(task.task_id.clone()));
            }
        }
        Ok(Self { tasks, index })
    }

    /// Load the catalog through a dataset loader.
    pub fn load(loader: &dyn DatasetLoader) -> Result<Self, CatalogError> {
        let catalog = Self::from_tasks(loader.load()?)?;
        info!(tasks = catalog.len(), "Task catalog loaded");
        Ok(catalog)
    }

    /// Previews of every task, in dataset order.
    pub fn list(&self) -> Vec<TaskPreview> {
        self.tasks.iter().map(Task::to_preview).collect()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).map(|&pos| &self.tasks[pos])
    }

    /// Every task, in dataset order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
