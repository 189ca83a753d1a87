//! MCP protocol server — JSON-RPC 2.0 over two transports.
//!
//! - `transport` — wire types, error codes, lifecycle handlers
//! - `tools`     — the fixed tool catalogue and its schemas
//! - `dispatch`  — message routing and per-tool handlers
//! - `session`   — session registry for the multiplexed transport
//! - `stdio`     — newline-delimited duplex stream transport
//! - `http`      — multiplexed POST endpoint + SSE notice stream

pub mod dispatch;
pub mod http;
pub mod session;
pub mod stdio;
pub mod tools;
pub mod transport;

pub use dispatch::OperationContext;
pub use session::SessionRegistry;
