//! Protocol message routing and tool-call dispatch.
//!
//! Both transports funnel every parsed message through [`handle_message`]
//! with an [`OperationContext`] describing where it came from. The dispatch
//! layer owns identity resolution, argument extraction, and mapping
//! operation errors onto protocol error codes. Unexpected internal faults
//! are collapsed to a generic internal error so raw error text never
//! reaches a client.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::CoordError;
use crate::identity::{self, Identity};
use crate::notify::{
    self, Channel, DeployStatus, DeploymentNotice, Environment, TaskCompleteNotice,
};
use crate::AppContext;

use super::tools;
use super::transport::{
    handle_initialize, handle_initialized, handle_ping, notice_json, McpError, McpMessage,
    McpResponse, MCP_INVALID_REQUEST, MCP_METHOD_NOT_FOUND,
};

// ─── Operation context ───────────────────────────────────────────────────────

/// Per-call transport context. The dispatcher never inspects the transport
/// itself — everything identity- or session-shaped arrives here.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Session token, when the call arrived over the multiplexed transport.
    /// Server-initiated notices are routed back to this session.
    pub session_id: Option<String>,
    /// Raw value of the transport identity header, unvalidated.
    pub header_identity: Option<String>,
}

// ─── Message routing ─────────────────────────────────────────────────────────

/// Route one protocol message. Returns `None` for notifications (which take
/// no response); transports write back whatever `Some` carries.
pub async fn handle_message(
    app: &Arc<AppContext>,
    op: &OperationContext,
    msg: McpMessage,
) -> Option<McpResponse> {
    let id = msg.id.clone();
    match msg.method.as_str() {
        "initialize" => Some(handle_initialize(id.unwrap_or(Value::Null))),
        "notifications/initialized" | "initialized" => {
            handle_initialized();
            None
        }
        "ping" => Some(handle_ping(id.unwrap_or(Value::Null))),
        "tools/list" => Some(McpResponse::ok(
            id.unwrap_or(Value::Null),
            tools::handle_tools_list(),
        )),
        "tools/call" => {
            let id = id.unwrap_or(Value::Null);
            Some(handle_tool_call(app, op, id, msg.params.unwrap_or(Value::Null)).await)
        }
        other => {
            debug!(method = other, "unknown method");
            // Unknown *requests* get an error; unknown notifications are
            // silently dropped per JSON-RPC.
            id.map(|id| {
                McpResponse::error(
                    id,
                    McpError::new(MCP_METHOD_NOT_FOUND, format!("unknown method '{other}'")),
                )
            })
        }
    }
}

async fn handle_tool_call(
    app: &Arc<AppContext>,
    op: &OperationContext,
    id: Value,
    params: Value,
) -> McpResponse {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return McpResponse::error(
            id,
            McpError::new(MCP_INVALID_REQUEST, "tools/call requires a 'name' field"),
        );
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    debug!(tool = name, session = op.session_id.as_deref(), "tool call");
    let outcome = dispatch_tool(app, op, name, &args).await;

    match outcome {
        Ok(result) => McpResponse::ok(id, result),
        Err(e) => McpResponse::error(id, McpError::new(e.code(), e.to_string())),
    }
}

// ─── Tool dispatch ───────────────────────────────────────────────────────────

type ToolResult = crate::error::Result<Value>;

async fn dispatch_tool(
    app: &Arc<AppContext>,
    op: &OperationContext,
    name: &str,
    args: &Value,
) -> ToolResult {
    match name {
        "create_task" => create_task(app, args).await,
        "get_my_tasks" => get_my_tasks(app, op, args).await,
        "list_tasks" => list_tasks(app, args).await,
        "update_task_status" => update_task_status(app, args).await,
        "add_task_comment" => add_task_comment(app, args).await,
        "notify_task_complete" => notify_task_complete(app, args).await,
        "notify_task_status" => notify_task_status(app, args).await,
        "notify_deployment" => notify_deployment(app, args).await,
        "notify_commit" => notify_commit(app, args).await,
        "send_message_to_ai" => send_message_to_ai(app, op, args).await,
        "broadcast_to_coordination" => broadcast_to_coordination(app, op, args).await,
        "send_slack_message" => send_slack_message(app, args).await,
        "get_project_status" => get_project_status(app).await,
        "claim_task" => claim_task(app, op, args).await,
        "start_my_work" => start_my_work(app, op).await,
        "complete_and_handoff" => complete_and_handoff(app, op, args).await,
        other => Err(CoordError::validation(format!("unknown tool '{other}'"))),
    }
}

// ─── Argument helpers ────────────────────────────────────────────────────────

fn str_arg<'a>(args: &'a Value, key: &str) -> crate::error::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoordError::validation(format!("missing required field '{key}'")))
}

fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn u64_arg(args: &Value, key: &str) -> crate::error::Result<u64> {
    args.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| CoordError::validation(format!("missing required integer field '{key}'")))
}

fn opt_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

fn bool_arg(args: &Value, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Resolve the calling identity for this operation, or fail with the
/// guidance error when no source yields one.
fn require_identity(
    app: &AppContext,
    op: &OperationContext,
    explicit: Option<Identity>,
) -> crate::error::Result<Identity> {
    identity::resolve(
        explicit,
        op.header_identity.as_deref(),
        app.config.default_identity,
    )
    .ok_or(CoordError::IdentityRequired)
}

/// Standard tool result envelope: a text summary plus the structured payload.
fn tool_result(summary: impl Into<String>, structured: Value) -> Value {
    json!({
        "content": [{ "type": "text", "text": summary.into() }],
        "structuredContent": structured,
    })
}

/// Queue a server-initiated notice back to the calling session, when there
/// is one. Stdio calls carry no session and get no notices.
fn notify_session(app: &AppContext, op: &OperationContext, text: &str) {
    if let Some(session) = &op.session_id {
        app.sessions
            .notice(session, notice_json("info", "tasks", text));
    }
}

// ─── Task tools ──────────────────────────────────────────────────────────────

async fn create_task(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let task = app
        .orchestrator
        .create_task(
            str_arg(args, "title")?,
            str_arg(args, "assignee")?,
            opt_str(args, "description"),
            opt_str(args, "priority"),
            opt_str(args, "component"),
        )
        .await?;
    Ok(tool_result(
        format!("Created task #{}: {}", task.id, task.title),
        json!({ "task": task }),
    ))
}

async fn get_my_tasks(app: &Arc<AppContext>, op: &OperationContext, args: &Value) -> ToolResult {
    // The only tool with an explicit identity argument; it feeds the same
    // resolver as every other source.
    let explicit = opt_str(args, "assignee")
        .map(crate::orchestrator::parse_identity)
        .transpose()?;
    let identity = require_identity(app, op, explicit)?;
    let tasks = app
        .orchestrator
        .list_tasks_for_ai(identity, opt_str(args, "status"), opt_str(args, "state"))
        .await?;
    Ok(tool_result(
        format!("{} task(s) for {identity}", tasks.len()),
        json!({ "assignee": identity, "tasks": tasks }),
    ))
}

async fn list_tasks(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let tasks = app
        .orchestrator
        .list_tasks(opt_str(args, "status"), opt_str(args, "state"))
        .await?;
    Ok(tool_result(
        format!("{} task(s)", tasks.len()),
        json!({ "tasks": tasks }),
    ))
}

async fn update_task_status(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let id = u64_arg(args, "taskId")?;
    let task = app
        .orchestrator
        .update_task_status(id, str_arg(args, "status")?)
        .await?;
    Ok(tool_result(
        format!("Task #{id} is now {}", task.status),
        json!({ "task": task }),
    ))
}

async fn add_task_comment(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let id = u64_arg(args, "taskId")?;
    app.orchestrator
        .add_task_comment(id, str_arg(args, "comment")?)
        .await?;
    Ok(tool_result(
        format!("Comment added to task #{id}"),
        json!({ "taskId": id, "commented": true }),
    ))
}

async fn get_project_status(app: &Arc<AppContext>) -> ToolResult {
    let status = app.orchestrator.project_status().await?;
    Ok(tool_result(
        format!("{} open task(s)", status.total_open),
        serde_json::to_value(&status)
            .map_err(|e| CoordError::Transport(e.to_string()))?,
    ))
}

// ─── Workflow tools ──────────────────────────────────────────────────────────

async fn claim_task(app: &Arc<AppContext>, op: &OperationContext, args: &Value) -> ToolResult {
    let identity = require_identity(app, op, None)?;
    let id = u64_arg(args, "taskId")?;
    let task = app.orchestrator.claim_task(identity, id).await?;
    notify_session(app, op, &format!("task #{id} claimed by {identity}"));
    Ok(tool_result(
        format!("Task #{id} claimed by {identity}"),
        json!({ "task": task }),
    ))
}

async fn start_my_work(app: &Arc<AppContext>, op: &OperationContext) -> ToolResult {
    let identity = require_identity(app, op, None)?;
    let started = app.orchestrator.start_my_work(identity).await?;
    let summary = match &started.task {
        Some(task) => {
            notify_session(
                app,
                op,
                &format!("task #{} claimed by {identity}", task.id),
            );
            format!("Started task #{}: {}", task.id, task.title)
        }
        None => format!("No ready tasks for {identity}"),
    };
    Ok(tool_result(
        summary,
        serde_json::to_value(&started).map_err(|e| CoordError::Transport(e.to_string()))?,
    ))
}

async fn complete_and_handoff(
    app: &Arc<AppContext>,
    op: &OperationContext,
    args: &Value,
) -> ToolResult {
    let identity = require_identity(app, op, None)?;
    let next_ai = str_arg(args, "nextAI")?;
    let task = app
        .orchestrator
        .complete_and_handoff(
            identity,
            opt_u64(args, "taskId"),
            next_ai,
            opt_str(args, "message"),
        )
        .await?;
    notify_session(
        app,
        op,
        &format!("task #{} handed off from {identity} to {next_ai}", task.id),
    );
    Ok(tool_result(
        format!("Task #{} completed — handed off to {next_ai}", task.id),
        json!({ "task": task, "nextAI": next_ai }),
    ))
}

// ─── Notification tools ──────────────────────────────────────────────────────
//
// Direct sends, unlike the fire-and-forget sends inside workflow
// transitions: the caller asked for exactly this send, so a gateway failure
// surfaces as the call's error.

async fn post_or_disabled(
    app: &Arc<AppContext>,
    channel: Channel,
    text: String,
) -> ToolResult {
    let Some(notifier) = &app.notifier else {
        warn!(channel = %channel, "notification requested but chat gateway is not configured");
        return Ok(tool_result(
            "Notifications are not configured — nothing sent",
            json!({ "sent": false, "disabled": true }),
        ));
    };
    notifier.post(channel, &text).await?;
    Ok(tool_result(
        format!("Posted to {channel}"),
        json!({ "sent": true, "channel": channel }),
    ))
}

async fn notify_task_complete(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let files: Vec<String> = args
        .get("files")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let notice = TaskCompleteNotice {
        task_id: u64_arg(args, "taskId")?,
        title: str_arg(args, "title")?,
        completed_by: str_arg(args, "completedBy")?,
        branch: opt_str(args, "branch"),
        commit: opt_str(args, "commit"),
        files: &files,
        next_ai: opt_str(args, "nextAI"),
        next_action: opt_str(args, "nextAction"),
    };
    post_or_disabled(app, Channel::Coordination, notify::task_complete_message(&notice)).await
}

async fn notify_task_status(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let text = notify::task_status_message(
        u64_arg(args, "taskId")?,
        str_arg(args, "title")?,
        str_arg(args, "oldStatus")?,
        str_arg(args, "newStatus")?,
        opt_str(args, "note"),
    );
    post_or_disabled(app, Channel::Coordination, text).await
}

async fn notify_deployment(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let environment = str_arg(args, "environment")?
        .parse::<Environment>()
        .map_err(|()| {
            CoordError::validation("unknown environment — expected production, staging, testing")
        })?;
    let status = str_arg(args, "status")?.parse::<DeployStatus>().map_err(|()| {
        CoordError::validation("unknown deploy status — expected started, success, failed")
    })?;
    let notice = DeploymentNotice {
        environment,
        branch: str_arg(args, "branch")?,
        commit: str_arg(args, "commit")?,
        status,
        url: opt_str(args, "url"),
        duration: opt_str(args, "duration"),
        error: opt_str(args, "error"),
    };
    post_or_disabled(app, Channel::Commits, notify::deployment_message(&notice)).await
}

async fn notify_commit(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let text = notify::commit_message(
        str_arg(args, "branch")?,
        str_arg(args, "message")?,
        str_arg(args, "author")?,
        str_arg(args, "sha")?,
        str_arg(args, "url")?,
        opt_u64(args, "filesChanged"),
    );
    post_or_disabled(app, Channel::Commits, text).await
}

async fn send_message_to_ai(
    app: &Arc<AppContext>,
    op: &OperationContext,
    args: &Value,
) -> ToolResult {
    let from = require_identity(app, op, None)?;
    let to = crate::orchestrator::parse_identity(str_arg(args, "toAI")?)?;
    let text = notify::direct_message(from, to, str_arg(args, "message")?, bool_arg(args, "urgent"));
    post_or_disabled(app, Channel::for_identity(to), text).await
}

async fn broadcast_to_coordination(
    app: &Arc<AppContext>,
    op: &OperationContext,
    args: &Value,
) -> ToolResult {
    let from = require_identity(app, op, None)?;
    let text = notify::broadcast_message(from, str_arg(args, "message")?);
    post_or_disabled(app, Channel::Coordination, text).await
}

async fn send_slack_message(app: &Arc<AppContext>, args: &Value) -> ToolResult {
    let channel = str_arg(args, "channel")?.parse::<Channel>().map_err(|()| {
        CoordError::validation(
            "unknown channel — expected coordination, cursor, codex, replit, commits",
        )
    })?;
    post_or_disabled(app, channel, str_arg(args, "text")?.to_string()).await
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_arg_rejects_missing_and_empty() {
        let args = json!({ "title": "", "ok": "yes" });
        assert!(str_arg(&args, "title").is_err());
        assert!(str_arg(&args, "absent").is_err());
        assert_eq!(str_arg(&args, "ok").unwrap(), "yes");
    }

    #[test]
    fn u64_arg_rejects_non_integers() {
        let args = json!({ "taskId": "7", "good": 7 });
        assert!(u64_arg(&args, "taskId").is_err());
        assert_eq!(u64_arg(&args, "good").unwrap(), 7);
    }

    #[test]
    fn tool_result_carries_both_shapes() {
        let v = tool_result("done", json!({ "x": 1 }));
        assert_eq!(v["content"][0]["type"], "text");
        assert_eq!(v["content"][0]["text"], "done");
        assert_eq!(v["structuredContent"]["x"], 1);
    }
}
