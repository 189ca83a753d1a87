//! JSON-RPC 2.0 wire types and lifecycle handlers for the protocol server.
//!
//! Both transports — the stdio duplex stream and the multiplexed HTTP
//! endpoint — speak MCP 2024-11-05 over these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Core message types ──────────────────────────────────────────────────────

/// An incoming JSON-RPC 2.0 request or notification.
///
/// Notifications (no `id`) use the same wire format but expect no response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response (success or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

// ─── Standard JSON-RPC error codes ───────────────────────────────────────────
//
// Operation-level codes (validation, not-found, ...) live in `crate::error`.

pub const MCP_PARSE_ERROR: i32 = -32700;
pub const MCP_INVALID_REQUEST: i32 = -32600;
pub const MCP_METHOD_NOT_FOUND: i32 = -32601;
pub const MCP_INTERNAL_ERROR: i32 = -32603;

// ─── Lifecycle ───────────────────────────────────────────────────────────────

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
}

/// Handle an `initialize` request. The HTTP transport mints the session
/// *before* calling this; the response body is transport-independent.
pub fn handle_initialize(id: Value) -> McpResponse {
    McpResponse::ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "logging": {}
            },
            "serverInfo": McpServerInfo {
                name: "coordd".into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }),
    )
}

/// Handle a `ping` request — respond with an empty result.
pub fn handle_ping(id: Value) -> McpResponse {
    McpResponse::ok(id, serde_json::json!({}))
}

/// Handle the `initialized` notification — no response is sent.
pub fn handle_initialized() {
    tracing::debug!("client sent 'initialized' — session is ready");
}

// ─── Server-initiated notices ────────────────────────────────────────────────

/// `notifications/message` — a log-level informational notice sent server →
/// client, correlated to a session. Used to announce side effects (e.g.
/// "task claimed") independently of the call's direct response.
pub fn notice_json(level: &str, logger: &str, text: &str) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "notifications/message",
        "params": {
            "level": level,
            "logger": logger,
            "data": text,
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_reports_protocol_and_server() {
        let resp = handle_initialize(serde_json::json!(1));
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "coordd");
        assert!(resp.error.is_none());
    }

    #[test]
    fn notice_is_a_valid_notification() {
        let raw = notice_json("info", "tasks", "task #3 claimed by cursor");
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["method"], "notifications/message");
        assert!(v.get("id").is_none());
        assert_eq!(v["params"]["data"], "task #3 claimed by cursor");
    }
}
