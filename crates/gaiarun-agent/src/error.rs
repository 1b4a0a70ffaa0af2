//! Error types for agent execution.

use std::time::Duration;

use gaiarun_core::{Message, Transcript};
use thiserror::Error;

/// Errors that can occur while running the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Failed to spawn the interpreter process.
    #[error("Failed to spawn interpreter process: {0}")]
    SpawnError(std::io::Error),

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interpreter process exited with an error.
    #[error("Interpreter exited with code {0}")]
    ProcessExit(i32),

    /// Protocol error during communication.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The run exceeded its time budget and the process was killed.
    #[error("Interpreter timed out after {0:?}")]
    Timeout(Duration),
}

/// A failed execution, carrying the messages collected before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    pub error: AgentError,
    pub transcript: Transcript,
}

impl ExecutionFailure {
    pub fn new(error: AgentError, transcript: Transcript) -> Self {
        Self { error, transcript }
    }

    /// Partial transcript with a synthetic error entry appended.
    pub fn into_transcript(self) -> Transcript {
        let mut transcript = self.transcript;
        transcript.push(Message::error(self.error.to_string()));
        transcript
    }
}
