//! Wire type for messages printed by the interpreter.

use gaiarun_core::{Message, Role};
use serde::Deserialize;
use serde_json::Value;

/// One line of interpreter stdout.
///
/// `content` is usually text. Anything else (console chunks, images) is
/// kept as its JSON rendering.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl From<AgentMessage> for Message {
    fn from(msg: AgentMessage) -> Self {
        let content = match msg.content {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Message {
            role: Role::from(msg.role),
            kind: msg.kind,
            content,
        }
    }
}
