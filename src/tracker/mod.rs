//! Task Store Gateway — the only layer that talks to the remote issue
//! tracker.
//!
//! The core depends on the narrow [`TaskTracker`] trait; the tracker owns no
//! state and offers no transactions. Every status read reflects the
//! tracker's current label set — there is no local cache and no staleness
//! guarantee beyond network latency.
//!
//! Implementations:
//!
//! | Module   | Backing store |
//! |----------|---------------|
//! | `github` | GitHub Issues — status/assignee carried as labels |
//! | `memory` | In-process store for tests and `--offline` runs   |

pub mod github;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::Identity;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Workflow status, stored as tracker metadata (a `status:<value>` label).
///
/// `ready → in-progress → needs-review → done`, with `blocked` reachable
/// from any non-terminal state. `done` is terminal for the core — it never
/// transitions out of it. Transitions are caller-directed and advisory: the
/// core validates the *target* value and persists it with an audit comment,
/// but does not enforce legal-predecessor rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Ready,
    InProgress,
    NeedsReview,
    Blocked,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::NeedsReview,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::NeedsReview => "needs-review",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }

    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ready" => Ok(TaskStatus::Ready),
            "in-progress" => Ok(TaskStatus::InProgress),
            "needs-review" => Ok(TaskStatus::NeedsReview),
            "blocked" => Ok(TaskStatus::Blocked),
            "done" => Ok(TaskStatus::Done),
            _ => Err(()),
        }
    }
}

// ─── Priority ────────────────────────────────────────────────────────────────

/// Descriptive priority, set at creation and never mutated by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(()),
        }
    }
}

// ─── Open/closed filter ──────────────────────────────────────────────────────

/// Tracker-level open/closed flag, orthogonal to `status`. A task can be
/// `done` yet remain open until a human closes it; the core never closes
/// tasks itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}

impl FromStr for StateFilter {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(StateFilter::Open),
            "closed" => Ok(StateFilter::Closed),
            "all" => Ok(StateFilter::All),
            _ => Err(()),
        }
    }
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// One unit of work, backed 1:1 by a tracker issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the tracker on creation; stable for the task's lifetime.
    pub id: u64,
    pub title: String,
    /// Set at creation; amended via comments rather than mutation.
    pub description: String,
    pub assignee: Identity,
    pub status: TaskStatus,
    pub priority: Option<Priority>,
    pub component: Option<String>,
    /// Tracker-level open/closed flag.
    pub open: bool,
    pub url: String,
}

/// Creation payload. The orchestrator validates fields before this ever
/// reaches a tracker implementation.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignee: Identity,
    pub priority: Option<Priority>,
    pub component: Option<String>,
}

/// List query. Ordering is whatever the backing store returns (typically
/// reverse-chronological); the core imposes no re-sort.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assignee: Option<Identity>,
    pub status: Option<TaskStatus>,
    pub state: StateFilter,
}

// ─── Gateway trait ───────────────────────────────────────────────────────────

/// Narrow contract over the remote issue tracker.
///
/// No method is transactional; mutating operations are single writes and
/// callers follow a read-after-write discipline when they need the resulting
/// state. Implementations must be safe to call concurrently.
#[async_trait::async_trait]
pub trait TaskTracker: Send + Sync {
    /// Create the backing issue; the tracker assigns the id.
    async fn create(&self, new: NewTask) -> Result<Task>;

    /// Fetch one task. `NotFound` when the id does not resolve to a
    /// coordination task.
    async fn get(&self, id: u64) -> Result<Task>;

    /// Passthrough query in the store's natural ordering.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Overwrite the status metadata. Not a compare-and-swap — concurrent
    /// writers can interleave, and the last write wins.
    async fn set_status(&self, id: u64, status: TaskStatus) -> Result<()>;

    /// Append a comment to the task's audit trail.
    async fn add_comment(&self, id: u64, body: &str) -> Result<()>;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn status_wire_form_round_trips() {
        for s in TaskStatus::ALL {
            assert_eq!(s.as_str().parse::<TaskStatus>(), Ok(s));
        }
        assert!("in_progress".parse::<TaskStatus>().is_err());
        assert!("open".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn state_filter_defaults_to_open() {
        assert_eq!(TaskFilter::default().state, StateFilter::Open);
    }

    proptest! {
        /// No string outside the five enumerated values ever parses — the
        /// core can never be tricked into writing an unrecognized status.
        #[test]
        fn arbitrary_strings_never_parse_to_status(s in "\\PC*") {
            if TaskStatus::ALL.iter().all(|v| v.as_str() != s) {
                prop_assert!(s.parse::<TaskStatus>().is_err());
            }
        }
    }
}
