//! Health and project-status routes.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::rest::error_response;
use crate::AppContext;

pub async fn health(State(app): State<Arc<AppContext>>) -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": app.started_at.elapsed().as_secs(),
        "sessions": app.sessions.count(),
        "tracker": if app.config.github.is_some() { "github" } else { "memory" },
        "notifications": app.notifier.is_some(),
    }))
    .into_response()
}

pub async fn project_status(State(app): State<Arc<AppContext>>) -> Response {
    match app.orchestrator.project_status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}
