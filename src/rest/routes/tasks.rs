//! Task routes: create, list, get, status change, comments.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::rest::error_response;
use crate::AppContext;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    pub title: String,
    pub assignee: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub component: Option<String>,
}

pub async fn create(
    State(app): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskBody>,
) -> Response {
    match app
        .orchestrator
        .create_task(
            &body.title,
            &body.assignee,
            body.description.as_deref(),
            body.priority.as_deref(),
            body.component.as_deref(),
        )
        .await
    {
        Ok(task) => (StatusCode::CREATED, Json(json!({ "task": task }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
}

pub async fn list(State(app): State<Arc<AppContext>>, Query(q): Query<ListQuery>) -> Response {
    let result = match q.assignee.as_deref() {
        Some(assignee) => match crate::orchestrator::parse_identity(assignee) {
            Ok(identity) => {
                app.orchestrator
                    .list_tasks_for_ai(identity, q.status.as_deref(), q.state.as_deref())
                    .await
            }
            Err(e) => return error_response(e),
        },
        None => {
            app.orchestrator
                .list_tasks(q.status.as_deref(), q.state.as_deref())
                .await
        }
    };
    match result {
        Ok(tasks) => Json(json!({ "tasks": tasks })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_one(State(app): State<Arc<AppContext>>, Path(id): Path<u64>) -> Response {
    match app.orchestrator.get_task(id).await {
        Ok(task) => Json(json!({ "task": task })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn set_status(
    State(app): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(body): Json<StatusBody>,
) -> Response {
    match app.orchestrator.update_task_status(id, &body.status).await {
        Ok(task) => Json(json!({ "task": task })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub comment: String,
}

pub async fn add_comment(
    State(app): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(body): Json<CommentBody>,
) -> Response {
    match app.orchestrator.add_task_comment(id, &body.comment).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "taskId": id, "commented": true })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
