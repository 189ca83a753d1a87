//! GitHub Issues implementation of the Task Store Gateway.
//!
//! Coordination tasks are issues carrying an `ai-task` marker label plus
//! `ai:<identity>` and `status:<value>` labels. Status changes are a
//! read-modify-write of the label set — GitHub offers no compare-and-swap,
//! so a concurrent writer can interleave between the read and the write.
//! That race is part of the documented behavioral contract; nothing here
//! tries to mask it.

use serde::Deserialize;
use serde_json::json;

use crate::error::{CoordError, Result};
use crate::identity::Identity;

use super::{NewTask, Priority, Task, TaskFilter, TaskStatus, TaskTracker};

/// Marker label on every issue the daemon manages.
const TASK_LABEL: &str = "ai-task";
const STATUS_PREFIX: &str = "status:";
const AI_PREFIX: &str = "ai:";
const PRIORITY_PREFIX: &str = "priority:";
const COMPONENT_PREFIX: &str = "component:";

pub struct GithubTracker {
    http: reqwest::Client,
    api_base: String,
    /// `owner/repo` slug.
    repo: String,
    token: String,
}

impl GithubTracker {
    pub fn new(api_base: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_base, self.repo)
    }

    fn issue_url(&self, id: u64) -> String {
        format!("{}/repos/{}/issues/{}", self.api_base, self.repo, id)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("User-Agent", "coordd")
            .header("Accept", "application/vnd.github+json")
    }

    /// Check a response status, mapping 404 to `NotFound` and everything
    /// else non-2xx to `Upstream` without leaking the response body.
    fn check(resp: &reqwest::Response, id: Option<u64>) -> Result<()> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(CoordError::NotFound(id));
            }
        }
        Err(CoordError::upstream(format!(
            "tracker returned HTTP {status}"
        )))
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IssueWire {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    html_url: String,
    #[serde(default)]
    labels: Vec<LabelWire>,
}

#[derive(Debug, Deserialize)]
struct LabelWire {
    name: String,
}

impl IssueWire {
    /// Map an issue onto the task model. Issues without a parseable
    /// `ai:<identity>` label are not coordination tasks and yield `None`.
    fn into_task(self) -> Option<Task> {
        let mut assignee = None;
        let mut status = None;
        let mut priority = None;
        let mut component = None;

        for label in &self.labels {
            let name = label.name.as_str();
            if let Some(rest) = name.strip_prefix(AI_PREFIX) {
                assignee = rest.parse::<Identity>().ok();
            } else if let Some(rest) = name.strip_prefix(STATUS_PREFIX) {
                status = rest.parse::<TaskStatus>().ok();
            } else if let Some(rest) = name.strip_prefix(PRIORITY_PREFIX) {
                priority = rest.parse::<Priority>().ok();
            } else if let Some(rest) = name.strip_prefix(COMPONENT_PREFIX) {
                component = Some(rest.to_string());
            }
        }

        Some(Task {
            id: self.number,
            title: self.title,
            description: self.body.unwrap_or_default(),
            assignee: assignee?,
            // A task whose status label was stripped externally reads as ready.
            status: status.unwrap_or(TaskStatus::Ready),
            priority,
            component,
            open: self.state == "open",
            url: self.html_url,
        })
    }
}

fn labels_for(new: &NewTask) -> Vec<String> {
    let mut labels = vec![
        TASK_LABEL.to_string(),
        format!("{AI_PREFIX}{}", new.assignee),
        format!("{STATUS_PREFIX}{}", TaskStatus::Ready),
    ];
    if let Some(p) = new.priority {
        labels.push(format!("{PRIORITY_PREFIX}{}", p.as_str()));
    }
    if let Some(c) = &new.component {
        labels.push(format!("{COMPONENT_PREFIX}{c}"));
    }
    labels
}

// ─── TaskTracker impl ────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl TaskTracker for GithubTracker {
    async fn create(&self, new: NewTask) -> Result<Task> {
        let body = json!({
            "title": new.title,
            "body": new.description,
            "labels": labels_for(&new),
        });

        let resp = self
            .request(reqwest::Method::POST, &self.issues_url())
            .json(&body)
            .send()
            .await?;
        Self::check(&resp, None)?;

        let wire: IssueWire = resp
            .json()
            .await
            .map_err(|_| CoordError::upstream("malformed tracker response"))?;
        wire.into_task()
            .ok_or_else(|| CoordError::upstream("tracker returned issue without identity label"))
    }

    async fn get(&self, id: u64) -> Result<Task> {
        let resp = self
            .request(reqwest::Method::GET, &self.issue_url(id))
            .send()
            .await?;
        Self::check(&resp, Some(id))?;

        let wire: IssueWire = resp
            .json()
            .await
            .map_err(|_| CoordError::upstream("malformed tracker response"))?;
        // An issue that exists but carries no ai: label is not ours.
        wire.into_task().ok_or(CoordError::NotFound(id))
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut labels = vec![TASK_LABEL.to_string()];
        if let Some(a) = filter.assignee {
            labels.push(format!("{AI_PREFIX}{a}"));
        }
        if let Some(s) = filter.status {
            labels.push(format!("{STATUS_PREFIX}{s}"));
        }

        let resp = self
            .request(reqwest::Method::GET, &self.issues_url())
            .query(&[
                ("labels", labels.join(",")),
                ("state", filter.state.as_str().to_string()),
                ("per_page", "100".to_string()),
            ])
            .send()
            .await?;
        Self::check(&resp, None)?;

        let wires: Vec<IssueWire> = resp
            .json()
            .await
            .map_err(|_| CoordError::upstream("malformed tracker response"))?;
        // The tracker's natural ordering (reverse-chronological) is preserved.
        Ok(wires.into_iter().filter_map(IssueWire::into_task).collect())
    }

    async fn set_status(&self, id: u64, status: TaskStatus) -> Result<()> {
        // Read-modify-write of the label set. Not atomic; last write wins.
        let resp = self
            .request(reqwest::Method::GET, &self.issue_url(id))
            .send()
            .await?;
        Self::check(&resp, Some(id))?;
        let wire: IssueWire = resp
            .json()
            .await
            .map_err(|_| CoordError::upstream("malformed tracker response"))?;

        let mut labels: Vec<String> = wire
            .labels
            .into_iter()
            .map(|l| l.name)
            .filter(|n| !n.starts_with(STATUS_PREFIX))
            .collect();
        labels.push(format!("{STATUS_PREFIX}{status}"));

        let resp = self
            .request(reqwest::Method::PUT, &format!("{}/labels", self.issue_url(id)))
            .json(&json!({ "labels": labels }))
            .send()
            .await?;
        Self::check(&resp, Some(id))
    }

    async fn add_comment(&self, id: u64, body: &str) -> Result<()> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("{}/comments", self.issue_url(id)),
            )
            .json(&json!({ "body": body }))
            .send()
            .await?;
        Self::check(&resp, Some(id))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(labels: &[&str]) -> IssueWire {
        IssueWire {
            number: 42,
            title: "t".into(),
            body: Some("d".into()),
            state: "open".into(),
            html_url: "https://example.test/42".into(),
            labels: labels
                .iter()
                .map(|n| LabelWire { name: n.to_string() })
                .collect(),
        }
    }

    #[test]
    fn labels_map_onto_task_fields() {
        let task = wire(&["ai-task", "ai:cursor", "status:in-progress", "priority:high", "component:api"])
            .into_task()
            .unwrap();
        assert_eq!(task.assignee, Identity::Cursor);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.component.as_deref(), Some("api"));
        assert!(task.open);
    }

    #[test]
    fn issue_without_identity_label_is_not_a_task() {
        assert!(wire(&["ai-task", "status:ready"]).into_task().is_none());
        assert!(wire(&["bug"]).into_task().is_none());
    }

    #[test]
    fn missing_status_label_reads_as_ready() {
        let task = wire(&["ai-task", "ai:codex"]).into_task().unwrap();
        assert_eq!(task.status, TaskStatus::Ready);
    }

    #[test]
    fn creation_labels_carry_ready_status() {
        let labels = labels_for(&NewTask {
            title: "t".into(),
            description: String::new(),
            assignee: Identity::Replit,
            priority: Some(Priority::Low),
            component: None,
        });
        assert!(labels.contains(&"ai-task".to_string()));
        assert!(labels.contains(&"ai:replit".to_string()));
        assert!(labels.contains(&"status:ready".to_string()));
        assert!(labels.contains(&"priority:low".to_string()));
    }
}
