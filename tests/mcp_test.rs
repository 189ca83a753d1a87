//! Protocol dispatch tests: the shared handler layer exercised directly,
//! the way both transports drive it.

use std::sync::Arc;

use coordd::config::CoordConfig;
use coordd::error::{CODE_IDENTITY_REQUIRED, CODE_INVALID_PARAMS, CODE_NOT_FOUND};
use coordd::identity::Identity;
use coordd::mcp::dispatch::{handle_message, OperationContext};
use coordd::mcp::tools::catalogue;
use coordd::mcp::transport::{McpMessage, MCP_METHOD_NOT_FOUND, PROTOCOL_VERSION};
use coordd::tracker::memory::MemoryTracker;
use coordd::AppContext;
use serde_json::{json, Value};

fn test_app(default_identity: Option<Identity>) -> Arc<AppContext> {
    let config = CoordConfig {
        port: 0,
        bind_address: "127.0.0.1".into(),
        data_dir: std::env::temp_dir(),
        log: "info".into(),
        log_format: "pretty".into(),
        default_identity,
        api_token: None,
        github: None,
        slack: None,
    };
    Arc::new(AppContext::new(config, Arc::new(MemoryTracker::new()), None))
}

fn request(method: &str, params: Value) -> McpMessage {
    McpMessage {
        jsonrpc: "2.0".into(),
        id: Some(json!(1)),
        method: method.into(),
        params: Some(params),
    }
}

fn tool_call(name: &str, arguments: Value) -> McpMessage {
    request("tools/call", json!({ "name": name, "arguments": arguments }))
}

async fn call(
    app: &Arc<AppContext>,
    op: &OperationContext,
    msg: McpMessage,
) -> coordd::mcp::transport::McpResponse {
    handle_message(app, op, msg).await.expect("expected a response")
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_and_tools_list() {
    let app = test_app(None);
    let op = OperationContext::default();

    let init = call(&app, &op, request("initialize", json!({}))).await;
    let result = init.result.unwrap();
    assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);

    let list = call(&app, &op, request("tools/list", json!({}))).await;
    let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(tools, catalogue().len());
    assert_eq!(tools, 16);
}

#[tokio::test]
async fn unknown_method_request_gets_method_not_found() {
    let app = test_app(None);
    let resp = call(&app, &OperationContext::default(), request("tasks/evict", json!({}))).await;
    assert_eq!(resp.error.unwrap().code, MCP_METHOD_NOT_FOUND);
}

#[tokio::test]
async fn unknown_notification_is_silently_dropped() {
    let app = test_app(None);
    let msg = McpMessage {
        jsonrpc: "2.0".into(),
        id: None,
        method: "notifications/whatever".into(),
        params: None,
    };
    assert!(handle_message(&app, &OperationContext::default(), msg).await.is_none());
}

// ─── Identity resolution through the transport seam ──────────────────────────

#[tokio::test]
async fn identity_required_without_any_source() {
    let app = test_app(None);
    let resp = call(
        &app,
        &OperationContext::default(),
        tool_call("start_my_work", json!({})),
    )
    .await;
    let err = resp.error.unwrap();
    assert_eq!(err.code, CODE_IDENTITY_REQUIRED);
    assert!(err.message.contains("X-AI-Identity"));
}

#[tokio::test]
async fn header_identity_drives_workflow_tools() {
    let app = test_app(None);
    let op = OperationContext {
        session_id: None,
        header_identity: Some("codex".into()),
    };

    call(
        &app,
        &op,
        tool_call("create_task", json!({ "title": "t", "assignee": "codex" })),
    )
    .await;
    let resp = call(&app, &op, tool_call("start_my_work", json!({}))).await;
    let structured = &resp.result.unwrap()["structuredContent"];
    assert_eq!(structured["started"], true);
    assert_eq!(structured["task"]["assignee"], "codex");
}

#[tokio::test]
async fn explicit_assignee_overrides_header_on_get_my_tasks() {
    let app = test_app(None);
    let op = OperationContext {
        session_id: None,
        header_identity: Some("codex".into()),
    };

    call(
        &app,
        &op,
        tool_call("create_task", json!({ "title": "for replit", "assignee": "replit" })),
    )
    .await;
    let resp = call(
        &app,
        &op,
        tool_call("get_my_tasks", json!({ "assignee": "replit" })),
    )
    .await;
    let structured = &resp.result.unwrap()["structuredContent"];
    assert_eq!(structured["assignee"], "replit");
    assert_eq!(structured["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_header_falls_back_to_default() {
    let app = test_app(Some(Identity::Replit));
    let op = OperationContext {
        session_id: None,
        header_identity: Some("not-an-agent".into()),
    };
    let resp = call(&app, &op, tool_call("start_my_work", json!({}))).await;
    // Resolves to the default and reports "nothing ready" rather than
    // failing identity resolution.
    let structured = &resp.result.unwrap()["structuredContent"];
    assert_eq!(structured["started"], false);
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_tool_is_a_validation_error() {
    let app = test_app(None);
    let resp = call(
        &app,
        &OperationContext::default(),
        tool_call("drop_all_tasks", json!({})),
    )
    .await;
    assert_eq!(resp.error.unwrap().code, CODE_INVALID_PARAMS);
}

#[tokio::test]
async fn unknown_task_id_maps_to_not_found() {
    let app = test_app(Some(Identity::Cursor));
    let resp = call(
        &app,
        &OperationContext::default(),
        tool_call("claim_task", json!({ "taskId": 404 })),
    )
    .await;
    assert_eq!(resp.error.unwrap().code, CODE_NOT_FOUND);
}

#[tokio::test]
async fn missing_required_field_is_invalid_params() {
    let app = test_app(None);
    let resp = call(
        &app,
        &OperationContext::default(),
        tool_call("create_task", json!({ "title": "no assignee" })),
    )
    .await;
    let err = resp.error.unwrap();
    assert_eq!(err.code, CODE_INVALID_PARAMS);
    assert!(err.message.contains("assignee"));
}

// ─── Disabled notifications ──────────────────────────────────────────────────

#[tokio::test]
async fn notify_tools_report_disabled_when_unconfigured() {
    let app = test_app(Some(Identity::Cursor));
    let resp = call(
        &app,
        &OperationContext::default(),
        tool_call(
            "broadcast_to_coordination",
            json!({ "message": "standup in 5" }),
        ),
    )
    .await;
    let structured = &resp.result.unwrap()["structuredContent"];
    assert_eq!(structured["sent"], false);
    assert_eq!(structured["disabled"], true);
}

// ─── Session notices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn claim_emits_a_notice_to_the_calling_session_only() {
    let app = test_app(Some(Identity::Cursor));
    let session = app.sessions.create();
    let other = app.sessions.create();
    let mut rx = app.sessions.subscribe(&session).unwrap();
    let mut rx_other = app.sessions.subscribe(&other).unwrap();

    let op = OperationContext {
        session_id: Some(session),
        header_identity: None,
    };
    call(
        &app,
        &op,
        tool_call("create_task", json!({ "title": "t", "assignee": "cursor" })),
    )
    .await;
    call(&app, &op, tool_call("claim_task", json!({ "taskId": 1 }))).await;

    let raw = rx.recv().await.unwrap();
    let notice: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(notice["method"], "notifications/message");
    assert!(notice["params"]["data"].as_str().unwrap().contains("claimed"));
    assert!(rx_other.try_recv().is_err(), "notice must not leak across sessions");
}
