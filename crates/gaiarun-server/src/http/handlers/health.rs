//! Liveness handlers.

use axum::{response::IntoResponse, Json};

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Connectivity probe used by the client; always answers `"good"`.
pub async fn check_connection() -> Json<&'static str> {
    Json("good")
}
