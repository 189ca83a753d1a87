//! Stdio transport: newline-delimited JSON-RPC over stdin/stdout.
//!
//! One process, one client, one implicit session. No session tokens are
//! minted and no server-initiated notices are emitted — the stream's
//! lifetime is the session. Identity normally comes from the configured
//! process-wide default, since a stdio daemon is typically spawned per
//! agent.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::{CoordError, Result};
use crate::AppContext;

use super::dispatch::{self, OperationContext};
use super::transport::{McpError, McpMessage, McpResponse, MCP_PARSE_ERROR};

/// Serve the protocol over stdin/stdout until EOF.
pub async fn run(app: Arc<AppContext>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    // Stdio carries no identity header and no session.
    let op = OperationContext::default();

    info!("stdio transport ready");
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CoordError::Transport(e.to_string()))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Malformed input is answered in-protocol, never by closing the
        // stream.
        let response = match serde_json::from_str::<McpMessage>(line) {
            Ok(msg) => dispatch::handle_message(&app, &op, msg).await,
            Err(e) => {
                debug!(err = %e, "unparseable request line");
                Some(McpResponse::error(
                    serde_json::Value::Null,
                    McpError::new(MCP_PARSE_ERROR, "parse error"),
                ))
            }
        };

        if let Some(response) = response {
            let mut out = response.to_json();
            out.push('\n');
            stdout
                .write_all(out.as_bytes())
                .await
                .map_err(|e| CoordError::Transport(e.to_string()))?;
            stdout
                .flush()
                .await
                .map_err(|e| CoordError::Transport(e.to_string()))?;
        }
    }

    info!("stdin closed — stdio transport shutting down");
    Ok(())
}
