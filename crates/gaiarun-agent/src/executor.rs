//! Interpreter executor for running the agent via subprocess.
//!
//! This module provides the [`AgentExecutor`] seam and the
//! [`InterpreterExecutor`] that implements it by spawning the interpreter
//! CLI in one-shot mode with JSON message output.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use gaiarun_core::{Message, RunConfiguration, Transcript};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error, info, warn};

use crate::error::{AgentError, ExecutionFailure};
use crate::types::AgentMessage;

/// The external agent capability: run a prompt, get back a transcript.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Execute `prompt` with fully resolved settings.
    ///
    /// On failure the returned [`ExecutionFailure`] still carries every
    /// message collected before the failure.
    async fn execute(
        &self,
        prompt: &str,
        settings: &RunConfiguration,
    ) -> Result<Transcript, ExecutionFailure>;
}

/// Environment variable the interpreter reads its api key from.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Executor for the interpreter agent.
#[derive(Debug, Clone)]
pub struct InterpreterExecutor {
    /// Path to the interpreter executable.
    interpreter_path: String,

    /// Arguments placed before the generated ones.
    base_args: Vec<String>,

    /// Working directory for the process (optional).
    working_dir: Option<PathBuf>,

    /// Time budget for one execution (optional).
    timeout: Option<Duration>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,
}

impl InterpreterExecutor {
    /// Create a new executor with the given path to the interpreter CLI.
    ///
    /// The path can be just "interpreter" to use PATH lookup, or a full path.
    pub fn new(interpreter_path: impl Into<String>) -> Self {
        Self {
            interpreter_path: interpreter_path.into(),
            base_args: Vec::new(),
            working_dir: None,
            timeout: None,
            env_vars: Vec::new(),
        }
    }

    /// Prepend fixed arguments, e.g. a wrapper script.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Command-line arguments for the given settings. The api key is
    /// passed through [`API_KEY_ENV`] instead.
    fn build_args(&self, settings: &RunConfiguration) -> Vec<String> {
        let mut args = self.base_args.clone();

        if let Some(model) = &settings.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(api_base) = &settings.api_base {
            args.push("--api_base".to_string());
            args.push(api_base.clone());
        }
        if let Some(window) = settings.context_window {
            args.push("--context_window".to_string());
            args.push(window.to_string());
        }
        if let Some(instructions) = &settings.system_prompt {
            args.push("--custom_instructions".to_string());
            args.push(instructions.clone());
        }
        if settings.auto_run {
            args.push("-y".to_string());
        }
        if settings.os_mode {
            args.push("--os".to_string());
        }

        args.push("--stdin".to_string());
        args.push("--json".to_string());
        args
    }

    /// Read stdout messages until EOF, then wait for the process.
    async fn drive(
        child: &mut Child,
        stdout: ChildStdout,
        transcript: &mut Transcript,
    ) -> Result<ExitStatus, AgentError> {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!(total_messages = transcript.len(), "Interpreter stdout closed (EOF)");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<AgentMessage>(trimmed) {
                Ok(message) => transcript.push(message.into()),
                Err(e) => {
                    let preview: String = trimmed.chars().take(200).collect();
                    warn!(error = %e, preview = %preview, "Failed to parse interpreter message");
                }
            }
        }

        Ok(child.wait().await?)
    }
}

impl Default for InterpreterExecutor {
    fn default() -> Self {
        Self::new("interpreter")
    }
}

#[async_trait]
impl AgentExecutor for InterpreterExecutor {
    async fn execute(
        &self,
        prompt: &str,
        settings: &RunConfiguration,
    ) -> Result<Transcript, ExecutionFailure> {
        info!(
            interpreter_path = %self.interpreter_path,
            prompt_len = prompt.len(),
            model = ?settings.model,
            "Preparing interpreter execution"
        );

        let mut transcript = vec![Message::user(prompt)];

        let mut cmd = Command::new(&self.interpreter_path);
        cmd.args(self.build_args(settings))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        // Never on argv, which other users can read.
        if let Some(api_key) = &settings.api_key {
            cmd.env(API_KEY_ENV, api_key);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(error = %e, "Failed to spawn interpreter process");
                return Err(ExecutionFailure::new(AgentError::SpawnError(e), transcript));
            }
        };

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                return Err(ExecutionFailure::new(
                    AgentError::ProtocolError("Failed to get process stdio handles".to_string()),
                    transcript,
                ));
            }
        };

        // Spawn stderr reader for logging
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            warn!(stderr = %trimmed, "Interpreter stderr");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error reading interpreter stderr");
                        break;
                    }
                }
            }
        });

        let mut stdin = stdin;
        if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
            return Err(ExecutionFailure::new(AgentError::Io(e), transcript));
        }
        drop(stdin);

        let outcome = match self.timeout {
            Some(limit) => {
                let timed =
                    tokio::time::timeout(limit, Self::drive(&mut child, stdout, &mut transcript)).await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(timeout = ?limit, "Interpreter timed out, killing process");
                        if let Err(e) = child.kill().await {
                            error!(error = %e, "Failed to kill interpreter process");
                        }
                        Err(AgentError::Timeout(limit))
                    }
                }
            }
            None => Self::drive(&mut child, stdout, &mut transcript).await,
        };

        let status = match outcome {
            Ok(status) => status,
            Err(e) => return Err(ExecutionFailure::new(e, transcript)),
        };

        let exit_code = status.code().unwrap_or(-1);
        info!(
            exit_code = exit_code,
            success = status.success(),
            messages = transcript.len(),
            "Interpreter process exited"
        );

        if !status.success() {
            return Err(ExecutionFailure::new(AgentError::ProcessExit(exit_code), transcript));
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaiarun_core::Role;

    #[test]
    fn test_build_args() {
        let executor = InterpreterExecutor::new("interpreter");
        let settings = RunConfiguration {
            auto_run: true,
            os_mode: false,
            model: Some("gpt-4o".to_string()),
            context_window: Some(16000),
            api_base: None,
            api_key: None,
            system_prompt: Some("Answer with FINAL ANSWER: <x>".to_string()),
        };

        let args = executor.build_args(&settings);
        assert_eq!(
            args,
            vec![
                "--model",
                "gpt-4o",
                "--context_window",
                "16000",
                "--custom_instructions",
                "Answer with FINAL ANSWER: <x>",
                "-y",
                "--stdin",
                "--json",
            ]
        );
    }

    #[test]
    fn test_api_key_not_in_args() {
        let executor = InterpreterExecutor::new("interpreter");
        let settings = RunConfiguration {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };

        let args = executor.build_args(&settings);
        assert!(!args.iter().any(|a| a.contains("sk-secret") || a == "--api_key"));
        assert_eq!(args, vec!["--stdin", "--json"]);
    }

    #[test]
    fn test_default_executor() {
        let executor = InterpreterExecutor::default();
        assert_eq!(executor.interpreter_path, "interpreter");
        assert!(executor.timeout.is_none());
        assert!(executor.base_args.is_empty());
    }

    #[cfg(unix)]
    fn script(body: &str) -> InterpreterExecutor {
        // Generated flags land in $1.. and are ignored by the script.
        InterpreterExecutor::new("sh").with_base_args(["-c", body, "agent"])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_json_lines() {
        let executor = script(
            r#"cat > /dev/null
echo '{"role": "assistant", "type": "message", "content": "thinking"}'
echo 'not json'
echo '{"role": "assistant", "type": "message", "content": "FINAL ANSWER: 7"}'"#,
        );

        let transcript = executor
            .execute("What is 3 + 4?", &RunConfiguration::default())
            .await
            .unwrap();

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].content, "What is 3 + 4?");
        assert_eq!(transcript[2].content, "FINAL ANSWER: 7");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_api_key_reaches_process_env() {
        let executor = script(
            r#"cat > /dev/null
printf '{"role": "assistant", "content": "key=%s args=%s"}\n' "$OPENAI_API_KEY" "$*""#,
        );
        let settings = RunConfiguration {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };

        let transcript = executor.execute("q", &settings).await.unwrap();

        assert_eq!(transcript[1].content, "key=sk-secret args=--stdin --json");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_partial_transcript() {
        let executor = script(
            r#"cat > /dev/null
echo '{"role": "assistant", "content": "partial"}'
exit 3"#,
        );

        let failure = executor
            .execute("q", &RunConfiguration::default())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, AgentError::ProcessExit(3)));
        let transcript = failure.into_transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].content, "partial");
        assert_eq!(transcript[2].role, Role::Error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let executor = script("cat > /dev/null; sleep 10").with_timeout(Duration::from_millis(200));

        let failure = executor
            .execute("q", &RunConfiguration::default())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, AgentError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let executor = InterpreterExecutor::new("/nonexistent/interpreter-binary");
        let failure = executor
            .execute("q", &RunConfiguration::default())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, AgentError::SpawnError(_)));
        assert_eq!(failure.transcript.len(), 1);
    }
}
