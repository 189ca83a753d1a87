//! Thin REST facade over the orchestrator.
//!
//! Request/response JSON only — every route delegates to the same
//! orchestrator the protocol server uses, so the facade adds no semantics
//! of its own. Mutating routes sit behind the bearer-token middleware;
//! reads and `/health` are open.

pub mod auth;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Json;
use serde_json::json;

use crate::error::CoordError;
use crate::AppContext;

/// Request bodies are small JSON documents; anything bigger is abuse.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(app: &Arc<AppContext>) -> axum::Router<Arc<AppContext>> {
    let open = axum::Router::new()
        .route("/health", get(routes::status::health))
        .route("/status", get(routes::status::project_status))
        .route("/tasks", get(routes::tasks::list))
        .route("/tasks/{id}", get(routes::tasks::get_one));

    let protected = axum::Router::new()
        .route("/tasks", post(routes::tasks::create))
        .route("/tasks/{id}/status", patch(routes::tasks::set_status))
        .route("/tasks/{id}/comments", post(routes::tasks::add_comment))
        .route("/notify/handoff", post(routes::notify::handoff))
        .route("/notify/message", post(routes::notify::message))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(app),
            auth::require_api_auth,
        ));

    open.merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Map an operation error onto an HTTP status + JSON error body.
pub(crate) fn error_response(e: CoordError) -> Response {
    let status = match &e {
        CoordError::Validation(_) | CoordError::IdentityRequired => StatusCode::BAD_REQUEST,
        CoordError::NotFound(_) => StatusCode::NOT_FOUND,
        CoordError::Upstream(_) => StatusCode::BAD_GATEWAY,
        CoordError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}
