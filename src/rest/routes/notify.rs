//! Notification routes. Gated on gateway configuration: 503 when the daemon
//! runs without chat, unlike the protocol tools which report a disabled send
//! as a successful no-op.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::notify::{self, Channel, HandoffRecord, Notifier};
use crate::rest::error_response;
use crate::AppContext;

fn notifier_or_unavailable(app: &AppContext) -> Result<&Arc<dyn Notifier>, Response> {
    app.notifier.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "notifications are not configured" })),
        )
            .into_response()
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffBody {
    pub from: String,
    pub to: String,
    pub task_id: u64,
    pub title: String,
    pub message: Option<String>,
}

pub async fn handoff(
    State(app): State<Arc<AppContext>>,
    Json(body): Json<HandoffBody>,
) -> Response {
    let notifier = match notifier_or_unavailable(&app) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let from = match crate::orchestrator::parse_identity(&body.from) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };
    let to = match crate::orchestrator::parse_identity(&body.to) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let text = notify::handoff_message(&HandoffRecord {
        from,
        to,
        task_id: body.task_id,
        title: body.title,
        message: body.message,
    });
    match notifier.post(Channel::for_identity(to), &text).await {
        Ok(()) => Json(json!({ "sent": true })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct MessageBody {
    pub channel: String,
    pub text: String,
}

pub async fn message(
    State(app): State<Arc<AppContext>>,
    Json(body): Json<MessageBody>,
) -> Response {
    let notifier = match notifier_or_unavailable(&app) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let channel = match body.channel.parse::<Channel>() {
        Ok(c) => c,
        Err(()) => {
            return error_response(crate::error::CoordError::validation(
                "unknown channel — expected coordination, cursor, codex, replit, commits",
            ))
        }
    };
    match notifier.post(channel, &body.text).await {
        Ok(()) => Json(json!({ "sent": true })).into_response(),
        Err(e) => error_response(e),
    }
}
