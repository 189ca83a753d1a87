//! Agent identities and the three-source identity resolver.
//!
//! An `Identity` is one of a small fixed set of known agent names. It is
//! asserted per call, validated at this boundary, and never persisted by the
//! core. Raw strings from transports do not flow past this module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport-level identity header. The header *name* is case-insensitive
/// per HTTP; the *value* is matched exactly against the fixed set.
pub const IDENTITY_HEADER: &str = "x-ai-identity";

/// The fixed set of known agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Cursor,
    Codex,
    Replit,
}

impl Identity {
    pub const ALL: [Identity; 3] = [Identity::Cursor, Identity::Codex, Identity::Replit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Identity::Cursor => "cursor",
            Identity::Codex => "codex",
            Identity::Replit => "replit",
        }
    }

    /// Comma-separated list of valid names, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|i| i.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Identity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cursor" => Ok(Identity::Cursor),
            "codex" => Ok(Identity::Codex),
            "replit" => Ok(Identity::Replit),
            _ => Err(()),
        }
    }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolve the calling identity from three sources, first match wins:
///
/// 1. an explicitly supplied identity argument (caller-asserted),
/// 2. the transport identity header — validated against the fixed set and
///    discarded when invalid or absent,
/// 3. the configured process-wide default (the stdio transport's usual path,
///    where one process is one agent).
///
/// Returns `None` when no source matches. Operations that require an
/// identity treat `None` as a precondition failure; read-only operations
/// tolerate it.
pub fn resolve(
    explicit: Option<Identity>,
    header: Option<&str>,
    default: Option<Identity>,
) -> Option<Identity> {
    if explicit.is_some() {
        return explicit;
    }
    if let Some(raw) = header {
        if let Ok(id) = raw.parse::<Identity>() {
            return Some(id);
        }
        tracing::debug!(value = raw, "ignoring invalid identity header");
    }
    default
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_fixed_set() {
        for id in Identity::ALL {
            assert_eq!(id.as_str().parse::<Identity>(), Ok(id));
        }
        assert!("claude".parse::<Identity>().is_err());
        assert!("Cursor".parse::<Identity>().is_err()); // case-sensitive
        assert!("".parse::<Identity>().is_err());
    }

    #[test]
    fn explicit_wins_over_conflicting_header() {
        let got = resolve(
            Some(Identity::Cursor),
            Some("codex"),
            Some(Identity::Replit),
        );
        assert_eq!(got, Some(Identity::Cursor));
    }

    #[test]
    fn header_wins_over_default_when_valid() {
        let got = resolve(None, Some("codex"), Some(Identity::Replit));
        assert_eq!(got, Some(Identity::Codex));
    }

    #[test]
    fn invalid_header_falls_through_to_default() {
        let got = resolve(None, Some("not-an-agent"), Some(Identity::Replit));
        assert_eq!(got, Some(Identity::Replit));
    }

    #[test]
    fn absent_everywhere_is_none() {
        assert_eq!(resolve(None, None, None), None);
        assert_eq!(resolve(None, Some("bogus"), None), None);
    }
}
