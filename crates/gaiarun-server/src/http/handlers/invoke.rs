//! Run invocation handlers.

use axum::{extract::State, Json};
use tracing::info;

use gaiarun_core::{RunId, TaskResult, TaskRunRequest};

use crate::http::responses::ApiError;
use crate::service::RunService;

/// Run a task and answer with its result once finished.
pub async fn invoke_task(
    State(service): State<RunService>,
    Json(request): Json<TaskRunRequest>,
) -> Result<Json<TaskResult>, ApiError> {
    info!(task_id = %request.task_id, "Invoking task");
    Ok(Json(service.invoke_sync(request).await?))
}

/// Start a task in the background and answer with the run id.
pub async fn invoke(
    State(service): State<RunService>,
    Json(request): Json<TaskRunRequest>,
) -> Result<Json<RunId>, ApiError> {
    info!(task_id = %request.task_id, "Invoking task in background");
    Ok(Json(service.invoke_async(request).await?))
}
