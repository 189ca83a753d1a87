//! In-process HTTP tests: the REST facade and the multiplexed protocol
//! endpoint served on a free port, driven with a real client.

use std::sync::Arc;

use coordd::config::CoordConfig;
use coordd::identity::Identity;
use coordd::tracker::memory::MemoryTracker;
use coordd::{mcp, rest, AppContext};
use serde_json::{json, Value};

async fn spawn_app(api_token: Option<String>, default_identity: Option<Identity>) -> String {
    let config = CoordConfig {
        port: 0,
        bind_address: "127.0.0.1".into(),
        data_dir: std::env::temp_dir(),
        log: "info".into(),
        log_format: "pretty".into(),
        default_identity,
        api_token,
        github: None,
        slack: None,
    };
    let app = Arc::new(AppContext::new(
        config,
        Arc::new(MemoryTracker::new()),
        None,
    ));

    let router = axum::Router::new()
        .merge(mcp::http::router())
        .nest("/api/v1", rest::router(&app))
        .with_state(app);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_open_and_reports_daemon_state() {
    let base = spawn_app(Some("secret".into()), None).await;
    let resp = reqwest::get(format!("{base}/api/v1/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tracker"], "memory");
    assert_eq!(body["notifications"], false);
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutating_routes_require_the_bearer_token() {
    let base = spawn_app(Some("secret".into()), None).await;
    let client = reqwest::Client::new();
    let body = json!({ "title": "t", "assignee": "cursor" });

    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .bearer_auth("wrong")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .bearer_auth("secret")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn reads_are_open_even_with_a_token_configured() {
    let base = spawn_app(Some("secret".into()), None).await;
    let resp = reqwest::get(format!("{base}/api/v1/tasks")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

// ─── Task lifecycle over REST ────────────────────────────────────────────────

#[tokio::test]
async fn task_lifecycle_over_the_facade() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{base}/api/v1/tasks"))
        .json(&json!({
            "title": "Fix login bug",
            "assignee": "cursor",
            "priority": "high"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["task"]["id"].as_u64().unwrap();
    assert_eq!(created["task"]["status"], "ready");

    let one: Value = reqwest::get(format!("{base}/api/v1/tasks/{id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["task"]["title"], "Fix login bug");

    let patched: Value = client
        .patch(format!("{base}/api/v1/tasks/{id}/status"))
        .json(&json!({ "status": "in-progress" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(patched["task"]["status"], "in-progress");

    let commented = client
        .post(format!("{base}/api/v1/tasks/{id}/comments"))
        .json(&json!({ "comment": "looking into it" }))
        .send()
        .await
        .unwrap();
    assert_eq!(commented.status(), 201);

    let listed: Value = reqwest::get(format!("{base}/api/v1/tasks?assignee=cursor"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn facade_maps_operation_errors_to_http_statuses() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();

    // Unknown task → 404
    let resp = reqwest::get(format!("{base}/api/v1/tasks/404")).await.unwrap();
    assert_eq!(resp.status(), 404);

    // Bad assignee → 400
    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .json(&json!({ "title": "t", "assignee": "claude" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Bad status value → 400
    let resp = client
        .patch(format!("{base}/api/v1/tasks/1/status"))
        .json(&json!({ "status": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn notify_routes_are_unavailable_without_a_gateway() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/api/v1/notify/message"))
        .json(&json!({ "channel": "coordination", "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

// ─── Protocol over HTTP ──────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_mints_a_session_and_calls_require_it() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();

    // A call before initialize is rejected in-protocol.
    let resp: Value = client
        .post(format!("{base}/mcp"))
        .body(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("mcp-session-id"));

    // initialize mints the session.
    let resp = client
        .post(format!("{base}/mcp"))
        .body(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }).to_string())
        .send()
        .await
        .unwrap();
    let session = resp
        .headers()
        .get("mcp-session-id")
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"]["serverInfo"]["name"], "coordd");

    // The session token unlocks tool calls.
    let resp: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .body(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 16);

    // A bogus token does not.
    let resp: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", "forged")
        .body(json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["error"]["message"], "unknown session");
}

#[tokio::test]
async fn delete_terminates_the_session() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/mcp"))
        .body(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }).to_string())
        .send()
        .await
        .unwrap();
    let session = resp.headers()["mcp-session-id"].to_str().unwrap().to_string();

    let resp = client
        .delete(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // The token is gone: protocol calls reject it, and a second delete 404s.
    let resp: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .body(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["error"]["message"], "unknown session");

    let resp = client
        .delete(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client.delete(format!("{base}/mcp")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn identity_header_flows_through_the_http_transport() {
    let base = spawn_app(None, None).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/mcp"))
        .body(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }).to_string())
        .send()
        .await
        .unwrap();
    let session = resp.headers()["mcp-session-id"].to_str().unwrap().to_string();

    let create: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .body(
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "create_task",
                            "arguments": { "title": "t", "assignee": "replit" } }
            })
            .to_string(),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(create["error"].is_null());

    let mine: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .header("x-ai-identity", "replit")
        .body(
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": { "name": "get_my_tasks", "arguments": {} }
            })
            .to_string(),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let structured = &mine["result"]["structuredContent"];
    assert_eq!(structured["assignee"], "replit");
    assert_eq!(structured["tasks"].as_array().unwrap().len(), 1);

    // Malformed body is answered in-protocol with a parse error.
    let resp: Value = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .body("{not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["error"]["code"], -32700);
}
