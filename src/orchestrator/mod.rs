//! Task Orchestrator — the claim / start-my-work / complete-and-handoff
//! workflow on top of the Task Store Gateway.
//!
//! The backing store is shared, externally mutable state with no
//! transactions and no compare-and-swap, so every operation follows a
//! **read-after-write, no-lock** discipline: issue the write, then re-read
//! to report the resulting state, accepting that another writer may
//! interleave. In particular `claim_task` / `start_my_work` are *not*
//! mutual-exclusion primitives — two identities racing to start the same
//! ready task can both succeed and both be told so. That race is part of
//! the documented contract; adding client-side check-then-set here would
//! only hide it without closing it.
//!
//! Notification sends triggered by transitions are fire-and-forget: a dead
//! chat gateway never fails or rolls back a status write.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CoordError, Result};
use crate::identity::Identity;
use crate::notify::{self, Channel, HandoffRecord, Notifier};
use crate::tracker::{NewTask, Priority, StateFilter, Task, TaskFilter, TaskStatus, TaskTracker};

pub struct TaskOrchestrator {
    tracker: Arc<dyn TaskTracker>,
    notifier: Option<Arc<dyn Notifier>>,
}

/// Result of `start_my_work`: either a freshly claimed task or nothing ready.
#[derive(Debug, Clone, Serialize)]
pub struct StartedWork {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

/// Aggregation over open tasks, backing `get_project_status`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub total_open: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_assignee: BTreeMap<String, usize>,
}

impl TaskOrchestrator {
    pub fn new(tracker: Arc<dyn TaskTracker>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { tracker, notifier }
    }

    // ─── Creation & queries ──────────────────────────────────────────────────

    /// Create a task. `assignee` and `priority` are validated against their
    /// fixed sets *before* any tracker call — an invalid value performs no
    /// write.
    pub async fn create_task(
        &self,
        title: &str,
        assignee: &str,
        description: Option<&str>,
        priority: Option<&str>,
        component: Option<&str>,
    ) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(CoordError::validation("title must not be empty"));
        }
        let assignee = parse_identity(assignee)?;
        let priority = priority
            .map(|p| {
                p.parse::<Priority>().map_err(|()| {
                    CoordError::validation(format!(
                        "unknown priority '{p}' — expected one of: low, medium, high"
                    ))
                })
            })
            .transpose()?;

        let task = self
            .tracker
            .create(NewTask {
                title: title.to_string(),
                description: description.unwrap_or_default().to_string(),
                assignee,
                priority,
                component: component.map(str::to_string),
            })
            .await?;

        info!(task_id = task.id, assignee = %assignee, "task created");
        Ok(task)
    }

    /// Passthrough query; ordering is the backing store's.
    pub async fn list_tasks(
        &self,
        status: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<Task>> {
        let filter = TaskFilter {
            assignee: None,
            status: parse_status_opt(status)?,
            state: parse_state_opt(state)?.unwrap_or_default(),
        };
        self.tracker.list(&filter).await
    }

    /// `list_tasks` with an implicit assignee filter.
    pub async fn list_tasks_for_ai(
        &self,
        identity: Identity,
        status: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<Task>> {
        let filter = TaskFilter {
            assignee: Some(identity),
            status: parse_status_opt(status)?,
            state: parse_state_opt(state)?.unwrap_or_default(),
        };
        self.tracker.list(&filter).await
    }

    pub async fn get_task(&self, id: u64) -> Result<Task> {
        self.tracker.get(id).await
    }

    // ─── Plain mutations ─────────────────────────────────────────────────────

    /// Validate the target value, write it, return the refreshed task.
    ///
    /// This is the one status mutation that carries no audit comment — it is
    /// the documented escape hatch for callers updating status directly.
    pub async fn update_task_status(&self, id: u64, status: &str) -> Result<Task> {
        let status = parse_status(status)?;
        self.tracker.set_status(id, status).await?;
        let task = self.tracker.get(id).await?;
        info!(task_id = id, status = %status, "task status updated");
        Ok(task)
    }

    pub async fn add_task_comment(&self, id: u64, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(CoordError::validation("comment must not be empty"));
        }
        // Surface NotFound before the tracker accepts a comment nowhere.
        self.tracker.add_comment(id, text).await
    }

    // ─── Workflow transitions ────────────────────────────────────────────────

    /// Mark a task in-progress on behalf of `identity` and append an audit
    /// comment naming the claimant.
    ///
    /// This is a best-effort "I am now working on this" signal, not a lock:
    /// no prior-status check is made, and re-claiming an in-progress task
    /// succeeds with the same end state.
    pub async fn claim_task(&self, identity: Identity, id: u64) -> Result<Task> {
        self.tracker.set_status(id, TaskStatus::InProgress).await?;
        let task = self.tracker.get(id).await?;

        // Audit comment is best-effort: a lost comment is acceptable, a lost
        // status write is not (and has already surfaced above).
        let comment = format!(
            "🔧 **{identity}** claimed this task at {}",
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        if let Err(e) = self.tracker.add_comment(id, &comment).await {
            warn!(task_id = id, err = %e, "claim audit comment failed (ignored)");
        }

        info!(task_id = id, identity = %identity, "task claimed");
        Ok(task)
    }

    /// Dispatch step: claim any one ready task for this identity, under the
    /// backing store's natural ordering — not "the globally next unit of
    /// work".
    pub async fn start_my_work(&self, identity: Identity) -> Result<StartedWork> {
        let ready = self
            .tracker
            .list(&TaskFilter {
                assignee: Some(identity),
                status: Some(TaskStatus::Ready),
                state: StateFilter::Open,
            })
            .await?;

        let Some(first) = ready.into_iter().next() else {
            return Ok(StartedWork {
                started: false,
                task: None,
            });
        };

        let task = self.claim_task(identity, first.id).await?;
        Ok(StartedWork {
            started: true,
            task: Some(task),
        })
    }

    /// Mark the task done, append a structured handoff comment naming the
    /// next identity, and post a handoff notification to that identity's
    /// channel when the gateway is configured.
    ///
    /// `task_id` is required: the core is stateless across calls and does
    /// not track a per-identity "current task".
    pub async fn complete_and_handoff(
        &self,
        identity: Identity,
        task_id: Option<u64>,
        next_ai: &str,
        message: Option<&str>,
    ) -> Result<Task> {
        let id = task_id.ok_or_else(|| {
            CoordError::validation(
                "taskId is required — the daemon does not track a current task per identity",
            )
        })?;
        let next_ai = parse_identity(next_ai)?;

        self.tracker.set_status(id, TaskStatus::Done).await?;
        let task = self.tracker.get(id).await?;

        let record = HandoffRecord {
            from: identity,
            to: next_ai,
            task_id: id,
            title: task.title.clone(),
            message: message.map(str::to_string),
        };

        let comment = format!(
            "✅ **{identity}** completed this task at {} — handing off to **{next_ai}**.{}",
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            record
                .message
                .as_deref()
                .map(|m| format!("\n\n> {m}"))
                .unwrap_or_default()
        );
        if let Err(e) = self.tracker.add_comment(id, &comment).await {
            warn!(task_id = id, err = %e, "handoff audit comment failed (ignored)");
        }

        if let Some(notifier) = &self.notifier {
            notify::post_detached(
                Arc::clone(notifier),
                Channel::for_identity(next_ai),
                notify::handoff_message(&record),
            );
        }

        info!(task_id = id, from = %identity, to = %next_ai, "task completed and handed off");
        Ok(task)
    }

    // ─── Aggregation ─────────────────────────────────────────────────────────

    pub async fn project_status(&self) -> Result<ProjectStatus> {
        let open = self
            .tracker
            .list(&TaskFilter {
                assignee: None,
                status: None,
                state: StateFilter::Open,
            })
            .await?;

        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_assignee: BTreeMap<String, usize> = BTreeMap::new();
        for task in &open {
            *by_status.entry(task.status.to_string()).or_default() += 1;
            *by_assignee.entry(task.assignee.to_string()).or_default() += 1;
        }

        Ok(ProjectStatus {
            total_open: open.len(),
            by_status,
            by_assignee,
        })
    }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

pub fn parse_identity(s: &str) -> Result<Identity> {
    s.parse::<Identity>().map_err(|()| {
        CoordError::validation(format!(
            "unknown identity '{s}' — expected one of: {}",
            Identity::valid_names()
        ))
    })
}

pub fn parse_status(s: &str) -> Result<TaskStatus> {
    s.parse::<TaskStatus>().map_err(|()| {
        CoordError::validation(format!(
            "unknown status '{s}' — expected one of: {}",
            TaskStatus::valid_values()
        ))
    })
}

fn parse_status_opt(s: Option<&str>) -> Result<Option<TaskStatus>> {
    s.map(parse_status).transpose()
}

fn parse_state_opt(s: Option<&str>) -> Result<Option<StateFilter>> {
    s.map(|v| {
        v.parse::<StateFilter>().map_err(|()| {
            CoordError::validation(format!(
                "unknown state '{v}' — expected one of: open, closed, all"
            ))
        })
    })
    .transpose()
}
