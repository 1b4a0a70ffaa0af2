//! Run history handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use gaiarun_core::{RunId, TaskRun, TaskRunPreview};

use crate::http::responses::ApiError;
use crate::service::RunService;

pub async fn list_runs(State(service): State<RunService>) -> Result<Json<Vec<TaskRunPreview>>, ApiError> {
    Ok(Json(service.runs().await?))
}

pub async fn get_run(
    State(service): State<RunService>,
    Path(run_id): Path<RunId>,
) -> Result<Json<TaskRun>, ApiError> {
    Ok(Json(service.run(&run_id).await?))
}
