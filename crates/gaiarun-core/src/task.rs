//! Benchmark task types.
//!
//! A [`Task`] deserializes from both the raw GAIA dataset columns
//! (`Level`, `Question`, `Final answer`, ...) and the snake_case names
//! it serializes to, so an exported task list can be loaded back.

use crate::TaskId;
use serde::{Deserialize, Deserializer, Serialize};

/// Descriptive metadata written by the dataset annotators.
///
/// Never used by execution logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorMetadata {
    #[serde(alias = "Steps", default)]
    pub steps: String,

    #[serde(alias = "Number of steps", default, deserialize_with = "text_or_number")]
    pub number_of_steps: String,

    #[serde(alias = "How long did this take?", default)]
    pub length_of_time: String,

    #[serde(alias = "Tools", default)]
    pub tools: String,

    #[serde(alias = "Number of tools", default, deserialize_with = "text_or_number")]
    pub number_of_tools: String,
}

/// A benchmark problem with a known correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Dataset-assigned task identifier.
    pub task_id: TaskId,

    /// Difficulty level.
    #[serde(alias = "Level", deserialize_with = "level_number")]
    pub level: i64,

    /// Prompt text handed to the agent.
    #[serde(alias = "Question")]
    pub question: String,

    /// Expected final answer, compared case-insensitively.
    #[serde(alias = "Final answer")]
    pub final_answer: String,

    /// Attached file name. Empty when the task has no attachment.
    #[serde(default)]
    pub file_name: String,

    #[serde(alias = "Annotator Metadata", default)]
    pub annotator_metadata: Option<AnnotatorMetadata>,
}

impl Task {
    /// Create a task without attachment or metadata.
    pub fn new(
        task_id: impl Into<TaskId>,
        level: i64,
        question: impl Into<String>,
        final_answer: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            level,
            question: question.into(),
            final_answer: final_answer.into(),
            file_name: String::new(),
            annotator_metadata: None,
        }
    }

    /// Builder method to attach a file.
    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Returns true if the task ships with an attached file.
    pub fn has_attachment(&self) -> bool {
        !self.file_name.is_empty()
    }

    /// Lightweight projection used for listings.
    pub fn to_preview(&self) -> TaskPreview {
        TaskPreview {
            task_id: self.task_id.clone(),
            level: self.level,
            question: self.question.clone(),
        }
    }
}

/// Reduced view of a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPreview {
    pub task_id: TaskId,
    pub level: i64,
    pub question: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(i64),
}

// The dataset stores some numeric columns as text and some exports
// store them as numbers.
fn level_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Number(n) => Ok(n),
        TextOrNumber::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Number(n) => n.to_string(),
    })
}
