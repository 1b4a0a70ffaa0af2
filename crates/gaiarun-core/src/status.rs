//! Result status tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome class of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    /// Extracted answer matched the expected answer.
    Correct,
    /// Extracted answer did not match.
    Incorrect,
    /// No final answer marker in the agent output.
    NotFound,
    /// The agent execution failed.
    Error,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::NotFound => "not-found",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
