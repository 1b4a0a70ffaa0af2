//! Task catalog handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use gaiarun_core::{Task, TaskId, TaskPreview, TaskRunPreview};

use crate::http::responses::ApiError;
use crate::service::RunService;

pub async fn list_tasks(State(service): State<RunService>) -> Json<Vec<TaskPreview>> {
    Json(service.tasks())
}

pub async fn get_task(
    State(service): State<RunService>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(service.task(&task_id)?))
}

/// Run history of one task.
pub async fn get_task_runs(
    State(service): State<RunService>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Vec<TaskRunPreview>>, ApiError> {
    Ok(Json(service.task_runs(&task_id).await?))
}
