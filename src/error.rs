//! Error taxonomy shared by the orchestrator, gateways, and both transports.
//!
//! Every fault a caller can observe is one of these variants. Transports map
//! the variant to a numeric protocol code; unexpected internal faults are
//! collapsed into a generic internal error so raw error text never leaks.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordError>;

#[derive(Debug, Error)]
pub enum CoordError {
    /// Missing or invalid required field (bad assignee, unknown status, ...).
    /// Never retried; always reported synchronously.
    #[error("{0}")]
    Validation(String),

    /// Unknown task id.
    #[error("task #{0} not found")]
    NotFound(u64),

    /// An identity-dependent operation was called with no resolvable identity.
    #[error(
        "no identity resolved — pass an explicit identity argument, set the \
         X-AI-Identity header, or configure a default with COORDD_DEFAULT_AI"
    )]
    IdentityRequired,

    /// The task store or notification gateway failed. Task-store failures
    /// fail the operation; notification failures during task operations are
    /// logged and swallowed before they ever become this variant.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Malformed session or connection-level fault, isolated to one session.
    #[error("transport error: {0}")]
    Transport(String),
}

// ─── Protocol error codes ────────────────────────────────────────────────────
//
// JSON-RPC reserves -32600..-32700; the -32000 range is ours.

pub const CODE_NOT_FOUND: i32 = -32001;
pub const CODE_IDENTITY_REQUIRED: i32 = -32003;
pub const CODE_UPSTREAM: i32 = -32005;
pub const CODE_INVALID_PARAMS: i32 = -32602;
pub const CODE_INTERNAL: i32 = -32603;

impl CoordError {
    /// Numeric code for the protocol response envelope.
    pub fn code(&self) -> i32 {
        match self {
            CoordError::Validation(_) => CODE_INVALID_PARAMS,
            CoordError::NotFound(_) => CODE_NOT_FOUND,
            CoordError::IdentityRequired => CODE_IDENTITY_REQUIRED,
            CoordError::Upstream(_) => CODE_UPSTREAM,
            CoordError::Transport(_) => CODE_INTERNAL,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoordError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        CoordError::Upstream(msg.into())
    }
}

impl From<reqwest::Error> for CoordError {
    fn from(e: reqwest::Error) -> Self {
        // Strip the URL from the message — tokens can appear in query strings.
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else {
            "request"
        };
        let host = e
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("upstream")
            .to_string();
        CoordError::Upstream(format!("{kind} error talking to {host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CoordError::validation("x").code(), CODE_INVALID_PARAMS);
        assert_eq!(CoordError::NotFound(7).code(), CODE_NOT_FOUND);
        assert_eq!(CoordError::IdentityRequired.code(), CODE_IDENTITY_REQUIRED);
        assert_eq!(CoordError::upstream("x").code(), CODE_UPSTREAM);
    }

    #[test]
    fn identity_required_message_carries_guidance() {
        let msg = CoordError::IdentityRequired.to_string();
        assert!(msg.contains("X-AI-Identity"));
        assert!(msg.contains("COORDD_DEFAULT_AI"));
    }
}
