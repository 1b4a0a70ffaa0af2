//! Run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, ResultStatus, RunConfiguration, RunId, Task, TaskId, TaskPreview, TaskResult};

/// One timestamped execution attempt of a Task.
///
/// The run embeds the full task snapshot so history stays readable even
/// if the catalog changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    /// Unique run identifier.
    pub id: RunId,

    /// When the run was started.
    pub started: DateTime<Utc>,

    /// Snapshot of the task being run.
    pub task: Task,

    /// Configuration the run was invoked with, minus the api key.
    #[serde(serialize_with = "crate::config::serialize_redacted")]
    pub command: RunConfiguration,

    /// Absent while the run is still executing.
    #[serde(default)]
    pub result: Option<TaskResult>,

    /// When the result was recorded.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
}

impl TaskRun {
    /// Create a new, still running, TaskRun.
    pub fn new(task: Task, command: RunConfiguration) -> Self {
        Self {
            id: RunId::generate(),
            started: Utc::now(),
            task,
            command: command.redacted(),
            result: None,
            finished: None,
        }
    }

    /// Returns true once a result has been recorded.
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    /// Record the result. A run can only be finished once.
    pub fn finish(&mut self, result: TaskResult) -> Result<(), CoreError> {
        if self.is_finished() {
            return Err(CoreError::AlreadyFinished(self.id.clone()));
        }
        self.result = Some(result);
        self.finished = Some(Utc::now());
        Ok(())
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task.task_id
    }

    /// Listing projection without the transcript.
    pub fn to_preview(&self) -> TaskRunPreview {
        TaskRunPreview {
            id: self.id.clone(),
            task: self.task.to_preview(),
            started: self.started,
            result: self.result.as_ref().map(TaskResult::status),
            finished: self.finished,
        }
    }
}

/// Reduced view of a [`TaskRun`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunPreview {
    pub id: RunId,
    pub task: TaskPreview,
    pub started: DateTime<Utc>,
    pub result: Option<ResultStatus>,
    pub finished: Option<DateTime<Utc>>,
}

/// Request body for invoking a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunRequest {
    pub command: RunConfiguration,
    pub task_id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> TaskRun {
        TaskRun::new(Task::new("t1", 1, "What is 3 + 4?", "7"), RunConfiguration::default())
    }

    #[test]
    fn test_run_never_exposes_api_key() {
        let command = RunConfiguration {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let mut run = TaskRun::new(Task::new("t1", 1, "q", "a"), command);
        assert_eq!(run.command.api_key, None);

        // Records written before redaction still serialize without the key.
        run.command.api_key = Some("sk-secret".to_string());
        let value = serde_json::to_value(&run).unwrap();
        assert!(value["command"].get("api_key").map_or(true, |k| k.is_null()));
        assert!(!value.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_new_run_is_running() {
        let run = sample_run();
        assert!(!run.is_finished());
        assert!(run.finished.is_none());

        let preview = run.to_preview();
        assert_eq!(preview.result, None);
        assert_eq!(preview.task.task_id, TaskId::new("t1"));
    }

    #[test]
    fn test_finish_once() {
        let mut run = sample_run();
        run.finish(TaskResult::NotFound { transcript: vec![] }).unwrap();

        assert!(run.is_finished());
        assert!(run.finished.is_some());
        assert_eq!(run.to_preview().result, Some(ResultStatus::NotFound));

        let second = run.finish(TaskResult::Error {
            message: "late".to_string(),
            transcript: vec![],
        });
        assert!(matches!(second, Err(CoreError::AlreadyFinished(_))));
        assert_eq!(run.to_preview().result, Some(ResultStatus::NotFound));
    }

    #[test]
    fn test_request_with_legacy_empty_strings() {
        let raw = r#"{"task_id": "t1", "command": {"auto_run": true, "os_mode": false,
                      "model": "", "api_base": "", "api_key": "", "system_prompt": ""}}"#;
        let request: TaskRunRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.task_id, TaskId::new("t1"));
        assert!(request.command.auto_run);
        assert!(request.command.model.is_none());
    }
}
