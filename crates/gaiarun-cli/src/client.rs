//! HTTP client for the benchmark server API.

use std::collections::VecDeque;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use gaiarun_core::{
    RunConfiguration, RunId, Task, TaskId, TaskPreview, TaskResult, TaskRun, TaskRunPreview,
    TaskRunRequest, TaskUpdate,
};

use crate::error::ClientError;

/// Prefix the server mounts its API under.
const API_PREFIX: &str = "/gaia";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the REST API.
pub struct GaiaClient {
    inner: reqwest::Client,
    base_url: String,
}

impl GaiaClient {
    /// Create a new client for the server at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Returns true if the server answers the connectivity probe.
    pub async fn check_connection(&self, timeout: Duration) -> Result<bool, ClientError> {
        let answer: String = self
            .decode(self.inner.get(self.url("/check-connection")).timeout(timeout).send().await?)
            .await?;
        Ok(answer == "good")
    }

    pub async fn tasks(&self) -> Result<Vec<TaskPreview>, ClientError> {
        self.get_json("/tasks").await
    }

    pub async fn task(&self, task_id: &TaskId) -> Result<Task, ClientError> {
        self.get_json(&format!("/tasks/{}", task_id)).await
    }

    pub async fn task_runs(&self, task_id: &TaskId) -> Result<Vec<TaskRunPreview>, ClientError> {
        self.get_json(&format!("/tasks/{}/runs", task_id)).await
    }

    pub async fn runs(&self) -> Result<Vec<TaskRunPreview>, ClientError> {
        self.get_json("/runs").await
    }

    pub async fn run(&self, run_id: &RunId) -> Result<TaskRun, ClientError> {
        self.get_json(&format!("/runs/{}", run_id)).await
    }

    /// Run a task and wait for its result.
    pub async fn invoke_task(
        &self,
        task_id: TaskId,
        command: RunConfiguration,
    ) -> Result<TaskResult, ClientError> {
        self.post_json("/invoke-task", &TaskRunRequest { command, task_id })
            .await
    }

    /// Start a task in the background.
    pub async fn invoke(&self, task_id: TaskId, command: RunConfiguration) -> Result<RunId, ClientError> {
        self.post_json("/invoke", &TaskRunRequest { command, task_id })
            .await
    }

    /// Open the run update stream.
    pub async fn updates(&self) -> Result<UpdateStream, ClientError> {
        let url = self.url("/check-runs");
        debug!(url = %url, "Opening update stream");

        let response = self.inner.get(&url).send().await?;
        let response = Self::check(response).await?;
        Ok(UpdateStream {
            response,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
        })
    }

    /// Get JSON from an endpoint.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        self.decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;
        self.decode(response).await
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, ClientError> {
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Live feed of run updates.
pub struct UpdateStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl UpdateStream {
    /// Next update, or `None` once the server closes the stream.
    pub async fn next(&mut self) -> Option<Result<TaskUpdate, ClientError>> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(
                    serde_json::from_str(&data).map_err(|e| ClientError::Serialization(e.to_string())),
                );
            }

            match self.response.chunk().await {
                Ok(Some(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Incremental Server-Sent Events decoder yielding event data payloads.
///
/// Chunks are raw bytes and may end mid character; only complete lines
/// are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a chunk; returns the data of every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Comments and other fields are ignored
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_splits_events() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: {\"tag\":\"started\",\"run_id\":\"r1\"}\n\ndata: second\n\n");
        assert_eq!(events, vec![r#"{"tag":"started","run_id":"r1"}"#, "second"]);
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"tag\":\"fin").is_empty());
        assert!(decoder.push(b"ished\"}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec![r#"{"tag":"finished"}"#]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_keep_alives() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": skipped 3 events\n\n:\n\nevent: update\ndata: x\n\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        assert_eq!(decoder.push(b"data: a\ndata:b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn test_decoder_keeps_characters_split_across_chunks() {
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["café"]);
    }

    #[test]
    fn test_urls_use_api_prefix() {
        let client = GaiaClient::new("http://localhost:8000/");
        assert_eq!(client.url("/tasks"), "http://localhost:8000/gaia/tasks");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = GaiaClient::new("http://127.0.0.1:1");
        let result = client.check_connection(Duration::from_millis(500)).await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }
}
