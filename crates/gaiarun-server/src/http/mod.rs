//! HTTP API.
//!
//! Provides endpoints for:
//! - Task catalog (`/tasks`, `/tasks/:id`, `/tasks/:id/runs`)
//! - Run history (`/runs`, `/runs/:id`)
//! - Invocation (`/invoke-task` synchronous, `/invoke` background)
//! - Run updates as Server-Sent Events (`/check-runs`)
//! - Connectivity and health (`/check-connection`, `/health`)
//!
//! The API routes are served at the root and again under `/gaia`.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::RunService;

mod handlers;
pub mod responses;

fn api_routes() -> Router<RunService> {
    Router::new()
        .route("/tasks", get(handlers::list_tasks))
        .route("/tasks/:id", get(handlers::get_task))
        .route("/tasks/:id/runs", get(handlers::get_task_runs))
        .route("/runs", get(handlers::list_runs))
        .route("/runs/:id", get(handlers::get_run))
        .route("/invoke-task", post(handlers::invoke_task))
        .route("/invoke", post(handlers::invoke))
        .route("/check-runs", get(handlers::check_runs))
        .route("/check-connection", get(handlers::check_connection))
}

/// Create the HTTP router.
pub fn create_router(service: RunService) -> Router {
    // Browser clients call from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = api_routes();

    Router::new()
        .merge(api.clone())
        .nest("/gaia", api)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}
