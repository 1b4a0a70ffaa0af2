//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::service::ServiceError;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Service error rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::TaskNotFound(_) | ServiceError::RunNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyFinished(_) => StatusCode::CONFLICT,
            ServiceError::Store(_) | ServiceError::Runner(_) | ServiceError::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerError;
    use gaiarun_core::{RunId, TaskId};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::TaskNotFound(TaskId::new("t")), StatusCode::NOT_FOUND),
            (ServiceError::RunNotFound(RunId::new("r")), StatusCode::NOT_FOUND),
            (ServiceError::AlreadyFinished(RunId::new("r")), StatusCode::CONFLICT),
            (
                ServiceError::Runner(RunnerError::Exhausted),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::Aborted("task panicked".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }
}
