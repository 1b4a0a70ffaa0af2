//! Run lifecycle updates published to event stream subscribers.

use serde::{Deserialize, Serialize};

use crate::{ResultStatus, RunId};

/// Run lifecycle update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TaskUpdate {
    /// Execution of the run has begun.
    Started { run_id: RunId },
    /// The run was finished and its result stored.
    Finished { run_id: RunId, result: ResultStatus },
}

impl TaskUpdate {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::Started { run_id } | Self::Finished { run_id, .. } => run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_shape() {
        let update = TaskUpdate::Started {
            run_id: RunId::new("r1"),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"tag":"started","run_id":"r1"}"#);
    }

    #[test]
    fn test_finished_shape() {
        let update = TaskUpdate::Finished {
            run_id: RunId::new("r1"),
            result: ResultStatus::NotFound,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["tag"], "finished");
        assert_eq!(json["result"], "not-found");
        assert_eq!(update.run_id().as_str(), "r1");
    }
}
