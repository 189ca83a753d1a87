//! HTTP transport: a multiplexed protocol endpoint plus a per-session SSE
//! notice stream.
//!
//! `POST /mcp` carries one JSON-RPC message per request. `initialize` mints
//! a session and returns its token in the `Mcp-Session-Id` response header;
//! every later call must echo that header back. Any number of sessions are
//! served concurrently over the same port, and a malformed message is
//! answered in-protocol for its session alone.
//!
//! `GET /mcp` (with a valid session header) opens a Server-Sent Events
//! stream carrying server-initiated `notifications/message` payloads for
//! that session. `DELETE /mcp` terminates the session; sessions a client
//! walks away from are reaped by the registry's idle eviction instead.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures_util::stream::{Stream, StreamExt};
use serde_json::Value;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::identity::IDENTITY_HEADER;
use crate::AppContext;

use super::dispatch::{self, OperationContext};
use super::transport::{
    McpError, McpMessage, McpResponse, MCP_INVALID_REQUEST, MCP_PARSE_ERROR,
};

/// Session correlation header, set by the server on `initialize` and echoed
/// by the client on every subsequent request.
pub const SESSION_HEADER: &str = "mcp-session-id";

pub fn router() -> Router<Arc<AppContext>> {
    Router::new().route(
        "/mcp",
        post(handle_post).get(handle_sse).delete(handle_delete),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ─── POST /mcp ───────────────────────────────────────────────────────────────

async fn handle_post(
    State(app): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let msg = match serde_json::from_str::<McpMessage>(&body) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(err = %e, "unparseable request body");
            let resp = McpResponse::error(
                Value::Null,
                McpError::new(MCP_PARSE_ERROR, "parse error"),
            );
            return protocol_response(resp, None);
        }
    };

    let header_identity = header_str(&headers, IDENTITY_HEADER).map(str::to_string);

    // `initialize` is the one method allowed without a session — it mints
    // one. Everything else must present a token the registry knows.
    if msg.method == "initialize" {
        let session = app.sessions.create();
        let op = OperationContext {
            session_id: Some(session.clone()),
            header_identity,
        };
        return match dispatch::handle_message(&app, &op, msg).await {
            Some(resp) => protocol_response(resp, Some(session)),
            None => StatusCode::ACCEPTED.into_response(),
        };
    }

    let Some(session) = header_str(&headers, SESSION_HEADER).map(str::to_string) else {
        let resp = McpResponse::error(
            msg.id.unwrap_or(Value::Null),
            McpError::new(
                MCP_INVALID_REQUEST,
                format!("missing {SESSION_HEADER} header — call initialize first"),
            ),
        );
        return protocol_response(resp, None);
    };
    if !app.sessions.touch(&session) {
        let resp = McpResponse::error(
            msg.id.unwrap_or(Value::Null),
            McpError::new(MCP_INVALID_REQUEST, "unknown session"),
        );
        return protocol_response(resp, None);
    }

    let op = OperationContext {
        session_id: Some(session),
        header_identity,
    };
    match dispatch::handle_message(&app, &op, msg).await {
        Some(resp) => protocol_response(resp, None),
        // Notifications take no response body.
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn protocol_response(resp: McpResponse, session: Option<String>) -> Response {
    let mut response = axum::Json(resp).into_response();
    if let Some(session) = session {
        if let Ok(value) = session.parse() {
            response.headers_mut().insert(
                axum::http::HeaderName::from_static(SESSION_HEADER),
                value,
            );
        }
    }
    response
}

// ─── DELETE /mcp ─────────────────────────────────────────────────────────────

async fn handle_delete(
    State(app): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> StatusCode {
    match header_str(&headers, SESSION_HEADER) {
        Some(token) if app.sessions.remove(token) => StatusCode::NO_CONTENT,
        Some(_) => StatusCode::NOT_FOUND,
        None => StatusCode::BAD_REQUEST,
    }
}

// ─── GET /mcp (SSE notices) ──────────────────────────────────────────────────

async fn handle_sse(
    State(app): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let session = header_str(&headers, SESSION_HEADER).ok_or(StatusCode::BAD_REQUEST)?;
    let rx = app
        .sessions
        .subscribe(session)
        .ok_or(StatusCode::NOT_FOUND)?;

    debug!(session, "sse notice stream opened");
    let stream = BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(payload) => Some(Ok(Event::default().event("message").data(payload))),
            // A lagged consumer skips dropped notices and keeps reading.
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
