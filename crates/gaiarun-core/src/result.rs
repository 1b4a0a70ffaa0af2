//! Classified outcome of a run.

use serde::{Deserialize, Serialize};

use crate::{ResultStatus, Transcript};

/// Result of executing a task, produced exactly once per run.
///
/// Every variant carries the transcript, possibly partial, so a stored
/// result can always be audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TaskResult {
    Correct {
        actual: String,
        transcript: Transcript,
    },
    Incorrect {
        expected: String,
        actual: String,
        transcript: Transcript,
    },
    NotFound {
        transcript: Transcript,
    },
    Error {
        message: String,
        transcript: Transcript,
    },
}

impl TaskResult {
    /// Status tag of this result.
    pub fn status(&self) -> ResultStatus {
        match self {
            Self::Correct { .. } => ResultStatus::Correct,
            Self::Incorrect { .. } => ResultStatus::Incorrect,
            Self::NotFound { .. } => ResultStatus::NotFound,
            Self::Error { .. } => ResultStatus::Error,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        match self {
            Self::Correct { transcript, .. }
            | Self::Incorrect { transcript, .. }
            | Self::NotFound { transcript }
            | Self::Error { transcript, .. } => transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    #[test]
    fn test_status_tag_on_the_wire() {
        let result = TaskResult::NotFound {
            transcript: vec![Message::assistant("no idea")],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "not-found");
        assert_eq!(json["transcript"][0]["content"], "no idea");
    }

    #[test]
    fn test_parse_incorrect() {
        let raw = r#"{"status": "incorrect", "expected": "7", "actual": "8", "transcript": []}"#;
        let result: TaskResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.status(), ResultStatus::Incorrect);
        assert!(result.transcript().is_empty());
    }
}
