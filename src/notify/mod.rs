//! Notification Gateway — best-effort structured messages to named channels.
//!
//! The gateway is optional: when chat is unconfigured the daemon runs
//! without it and every task-state transition still works. It is injected as
//! a single long-lived handle at startup (constructor injection, never a
//! module-level singleton) so tests can substitute a no-op or failing
//! double. Sends are independent, order-insensitive, and safe to issue
//! concurrently from any number of sessions.

pub mod slack;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::Identity;

// ─── Channels ────────────────────────────────────────────────────────────────

/// The five well-known destination channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Coordination,
    Cursor,
    Codex,
    Replit,
    Commits,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Coordination,
        Channel::Cursor,
        Channel::Codex,
        Channel::Replit,
        Channel::Commits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Coordination => "coordination",
            Channel::Cursor => "cursor",
            Channel::Codex => "codex",
            Channel::Replit => "replit",
            Channel::Commits => "commits",
        }
    }

    /// The per-agent channel an identity listens on.
    pub fn for_identity(id: Identity) -> Channel {
        match id {
            Identity::Cursor => Channel::Cursor,
            Identity::Codex => Channel::Codex,
            Identity::Replit => Channel::Replit,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "coordination" => Ok(Channel::Coordination),
            "cursor" => Ok(Channel::Cursor),
            "codex" => Ok(Channel::Codex),
            "replit" => Ok(Channel::Replit),
            "commits" => Ok(Channel::Commits),
            _ => Err(()),
        }
    }
}

// ─── Gateway trait ───────────────────────────────────────────────────────────

/// Post one message to a named channel. Implementations tolerate concurrent
/// invocation without serialization.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, channel: Channel, text: &str) -> Result<()>;
}

/// Fire-and-forget send used by task-state transitions: failures are logged
/// and never surface as the triggering call's result.
pub fn post_detached(notifier: Arc<dyn Notifier>, channel: Channel, text: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.post(channel, &text).await {
            tracing::warn!(channel = %channel, err = %e, "notification send failed (ignored)");
        }
    });
}

// ─── Handoff record ──────────────────────────────────────────────────────────

/// Ephemeral payload produced by a completion call. Exists only as the
/// notification body and the audit comment appended to the task.
#[derive(Debug, Clone)]
pub struct HandoffRecord {
    pub from: Identity,
    pub to: Identity,
    pub task_id: u64,
    pub title: String,
    pub message: Option<String>,
}

// ─── Notification input enums ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Testing,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Testing => "testing",
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "testing" => Ok(Environment::Testing),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Started,
    Success,
    Failed,
}

impl DeployStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Started => "started",
            DeployStatus::Success => "success",
            DeployStatus::Failed => "failed",
        }
    }
}

impl FromStr for DeployStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "started" => Ok(DeployStatus::Started),
            "success" => Ok(DeployStatus::Success),
            "failed" => Ok(DeployStatus::Failed),
            _ => Err(()),
        }
    }
}

// ─── Message formatting ──────────────────────────────────────────────────────
//
// One formatter per notification kind, so transports and the REST facade
// never assemble message text themselves.

pub fn handoff_message(rec: &HandoffRecord) -> String {
    let mut text = format!(
        "🤝 Handoff: {} finished task #{} \"{}\" — now with {}.",
        rec.from, rec.task_id, rec.title, rec.to
    );
    if let Some(msg) = &rec.message {
        text.push_str(&format!("\n> {msg}"));
    }
    text
}

pub struct TaskCompleteNotice<'a> {
    pub task_id: u64,
    pub title: &'a str,
    pub completed_by: &'a str,
    pub branch: Option<&'a str>,
    pub commit: Option<&'a str>,
    pub files: &'a [String],
    pub next_ai: Option<&'a str>,
    pub next_action: Option<&'a str>,
}

pub fn task_complete_message(n: &TaskCompleteNotice<'_>) -> String {
    let mut text = format!(
        "✅ Task #{} complete: \"{}\" (by {})",
        n.task_id, n.title, n.completed_by
    );
    if let Some(branch) = n.branch {
        text.push_str(&format!("\nbranch: {branch}"));
    }
    if let Some(commit) = n.commit {
        text.push_str(&format!("\ncommit: {commit}"));
    }
    if !n.files.is_empty() {
        text.push_str(&format!("\nfiles: {}", n.files.join(", ")));
    }
    if let Some(next) = n.next_ai {
        text.push_str(&format!("\nnext: {next}"));
        if let Some(action) = n.next_action {
            text.push_str(&format!(" — {action}"));
        }
    }
    text
}

pub fn task_status_message(
    task_id: u64,
    title: &str,
    old_status: &str,
    new_status: &str,
    note: Option<&str>,
) -> String {
    let mut text = format!("📋 Task #{task_id} \"{title}\": {old_status} → {new_status}");
    if let Some(note) = note {
        text.push_str(&format!("\n> {note}"));
    }
    text
}

pub struct DeploymentNotice<'a> {
    pub environment: Environment,
    pub branch: &'a str,
    pub commit: &'a str,
    pub status: DeployStatus,
    pub url: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub error: Option<&'a str>,
}

pub fn deployment_message(n: &DeploymentNotice<'_>) -> String {
    let icon = match n.status {
        DeployStatus::Started => "🚀",
        DeployStatus::Success => "✅",
        DeployStatus::Failed => "❌",
    };
    let mut text = format!(
        "{icon} Deploy {} on {}: {} @ {}",
        n.status.as_str(),
        n.environment.as_str(),
        n.branch,
        n.commit
    );
    if let Some(url) = n.url {
        text.push_str(&format!("\n{url}"));
    }
    if let Some(d) = n.duration {
        text.push_str(&format!("\ntook {d}"));
    }
    if let Some(e) = n.error {
        text.push_str(&format!("\nerror: {e}"));
    }
    text
}

pub fn commit_message(
    branch: &str,
    message: &str,
    author: &str,
    sha: &str,
    url: &str,
    files_changed: Option<u64>,
) -> String {
    let short = sha.get(..7).unwrap_or(sha);
    let mut text = format!("📝 {author} pushed {short} to {branch}: {message}\n{url}");
    if let Some(n) = files_changed {
        text.push_str(&format!("\n{n} file(s) changed"));
    }
    text
}

pub fn direct_message(from: Identity, to: Identity, message: &str, urgent: bool) -> String {
    let prefix = if urgent { "🚨 URGENT " } else { "" };
    format!("{prefix}💬 {from} → {to}: {message}")
}

pub fn broadcast_message(from: Identity, message: &str) -> String {
    format!("📢 {from}: {message}")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
