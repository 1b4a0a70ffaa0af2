//! Task runners: execute a task and classify the outcome.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use gaiarun_agent::AgentExecutor;
use gaiarun_core::{RunConfiguration, Task, TaskResult, Transcript};

/// Runner errors.
///
/// Agent failures are never reported here; they become
/// [`TaskResult::Error`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Fake runner has no results left")]
    Exhausted,

    #[error("Failed to load fake results from '{path}': {message}")]
    Load { path: PathBuf, message: String },
}

/// Executes a task under a given configuration.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, config: &RunConfiguration, task: &Task) -> Result<TaskResult, RunnerError>;
}

fn final_answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"FINAL ANSWER: (.+)").expect("valid final answer pattern"))
}

/// Text following `FINAL ANSWER: ` in the last transcript message, trimmed.
pub fn extract_final_answer(transcript: &Transcript) -> Option<String> {
    let last = transcript.last()?;
    let captures = final_answer_re().captures(&last.content)?;
    Some(captures[1].trim().to_string())
}

/// Classify a completed transcript against the task's expected answer.
pub fn classify(task: &Task, transcript: Transcript) -> TaskResult {
    let Some(actual) = extract_final_answer(&transcript) else {
        return TaskResult::NotFound { transcript };
    };

    if actual.to_lowercase() == task.final_answer.trim().to_lowercase() {
        TaskResult::Correct { actual, transcript }
    } else {
        TaskResult::Incorrect {
            expected: task.final_answer.clone(),
            actual,
            transcript,
        }
    }
}

/// Prompt handed to the agent: a file path hint, if any, then the question.
pub fn build_prompt(task: &Task, files_dir: &Path) -> String {
    if task.has_attachment() {
        let file_path = files_dir.join(&task.file_name);
        format!("file_path:{}\n{}", file_path.display(), task.question)
    } else {
        task.question.clone()
    }
}

/// Runner backed by the real agent.
pub struct AgentTaskRunner {
    executor: Arc<dyn AgentExecutor>,
    defaults: RunConfiguration,
    files_dir: PathBuf,
}

impl AgentTaskRunner {
    /// `defaults` fill in whatever a request leaves unset.
    pub fn new(executor: Arc<dyn AgentExecutor>, defaults: RunConfiguration) -> Self {
        Self {
            executor,
            defaults,
            files_dir: PathBuf::from("files"),
        }
    }

    /// Set the directory attached task files live in.
    pub fn with_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_dir = dir.into();
        self
    }
}

#[async_trait]
impl TaskRunner for AgentTaskRunner {
    async fn run(&self, config: &RunConfiguration, task: &Task) -> Result<TaskResult, RunnerError> {
        let settings = config.or(&self.defaults);
        let prompt = build_prompt(task, &self.files_dir);

        info!(task_id = %task.task_id, level = task.level, "Running task");

        let result = match self.executor.execute(&prompt, &settings).await {
            Ok(transcript) => classify(task, transcript),
            Err(failure) => {
                warn!(task_id = %task.task_id, error = %failure, "Agent execution failed");
                TaskResult::Error {
                    message: failure.error.to_string(),
                    transcript: failure.into_transcript(),
                }
            }
        };

        info!(task_id = %task.task_id, status = %result.status(), "Task finished");
        Ok(result)
    }
}

/// Deterministic runner returning pre-computed results in order.
pub struct FakeTaskRunner {
    results: Mutex<VecDeque<TaskResult>>,
}

impl FakeTaskRunner {
    pub fn new(results: Vec<TaskResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }

    /// Load results from a JSON array of task results.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let load_err = |message: String| RunnerError::Load {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let results: Vec<TaskResult> =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        Ok(Self::new(results))
    }

    /// Number of results not yet handed out.
    pub fn remaining(&self) -> usize {
        match self.results.lock() {
            Ok(results) => results.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[async_trait]
impl TaskRunner for FakeTaskRunner {
    async fn run(&self, _config: &RunConfiguration, task: &Task) -> Result<TaskResult, RunnerError> {
        let next = match self.results.lock() {
            Ok(mut results) => results.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        match next {
            Some(result) => {
                info!(task_id = %task.task_id, status = %result.status(), "Returning fake result");
                Ok(result)
            }
            None => Err(RunnerError::Exhausted),
        }
    }
}
