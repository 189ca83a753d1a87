//! The fixed tool catalogue, shared by both transports.
//!
//! Each definition carries the tool name, a human-readable title and
//! description, and a JSON Schema for its input. `tools/list` returns the
//! whole catalogue; `tools/call` is routed by `mcp::dispatch`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ─── Tool definition type ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDef {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl McpToolDef {
    fn new(name: &str, title: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            input_schema,
        }
    }
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// Returns the full operation catalogue. Defined as a function (not a
/// static) because `serde_json::json!` produces a non-`const` `Value`; the
/// list is small and cheap to allocate.
pub fn catalogue() -> Vec<McpToolDef> {
    vec![
        McpToolDef::new(
            "create_task",
            "Create task",
            "Create a new coordination task backed by a tracker issue.",
            json!({
                "type": "object",
                "required": ["title", "assignee"],
                "properties": {
                    "title": { "type": "string", "description": "Short task title." },
                    "assignee": { "type": "string", "enum": ["cursor", "codex", "replit"], "description": "Identity responsible for the task." },
                    "description": { "type": "string", "description": "What needs to be done. Amend later via comments." },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"], "description": "Descriptive priority; not mutated by the workflow." },
                    "component": { "type": "string", "description": "Descriptive component tag." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "get_my_tasks",
            "Get my tasks",
            "List tasks assigned to the calling identity (or an explicitly named one).",
            json!({
                "type": "object",
                "properties": {
                    "assignee": { "type": "string", "enum": ["cursor", "codex", "replit"], "description": "Explicit identity; defaults to the resolved caller identity." },
                    "status": { "type": "string", "enum": ["ready", "in-progress", "needs-review", "blocked", "done"], "description": "Filter by workflow status." },
                    "state": { "type": "string", "enum": ["open", "closed", "all"], "description": "Tracker open/closed filter. Defaults to open." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "list_tasks",
            "List tasks",
            "List coordination tasks across all identities.",
            json!({
                "type": "object",
                "properties": {
                    "status": { "type": "string", "enum": ["ready", "in-progress", "needs-review", "blocked", "done"], "description": "Filter by workflow status." },
                    "state": { "type": "string", "enum": ["open", "closed", "all"], "description": "Tracker open/closed filter. Defaults to open." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "update_task_status",
            "Update task status",
            "Set a task's workflow status directly, without an audit comment.",
            json!({
                "type": "object",
                "required": ["taskId", "status"],
                "properties": {
                    "taskId": { "type": "integer", "description": "Tracker-assigned task id." },
                    "status": { "type": "string", "enum": ["ready", "in-progress", "needs-review", "blocked", "done"], "description": "Target status." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "add_task_comment",
            "Add task comment",
            "Append a comment to a task's audit trail.",
            json!({
                "type": "object",
                "required": ["taskId", "comment"],
                "properties": {
                    "taskId": { "type": "integer", "description": "Tracker-assigned task id." },
                    "comment": { "type": "string", "description": "Comment body (markdown)." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "notify_task_complete",
            "Notify task complete",
            "Post a completion notice to the coordination channel. No task side effect.",
            json!({
                "type": "object",
                "required": ["taskId", "title", "completedBy"],
                "properties": {
                    "taskId": { "type": "integer" },
                    "title": { "type": "string" },
                    "completedBy": { "type": "string", "enum": ["cursor", "codex", "replit"] },
                    "branch": { "type": "string" },
                    "commit": { "type": "string" },
                    "files": { "type": "array", "items": { "type": "string" } },
                    "nextAI": { "type": "string", "enum": ["cursor", "codex", "replit"] },
                    "nextAction": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "notify_task_status",
            "Notify task status",
            "Post a status-change notice to the coordination channel. No task side effect.",
            json!({
                "type": "object",
                "required": ["taskId", "title", "oldStatus", "newStatus"],
                "properties": {
                    "taskId": { "type": "integer" },
                    "title": { "type": "string" },
                    "oldStatus": { "type": "string" },
                    "newStatus": { "type": "string" },
                    "note": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "notify_deployment",
            "Notify deployment",
            "Post a deployment notice to the commits channel.",
            json!({
                "type": "object",
                "required": ["environment", "branch", "commit", "status"],
                "properties": {
                    "environment": { "type": "string", "enum": ["production", "staging", "testing"] },
                    "branch": { "type": "string" },
                    "commit": { "type": "string" },
                    "status": { "type": "string", "enum": ["started", "success", "failed"] },
                    "url": { "type": "string" },
                    "duration": { "type": "string" },
                    "error": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "notify_commit",
            "Notify commit",
            "Post a commit notice to the commits channel.",
            json!({
                "type": "object",
                "required": ["branch", "message", "author", "sha", "url"],
                "properties": {
                    "branch": { "type": "string" },
                    "message": { "type": "string" },
                    "author": { "type": "string" },
                    "sha": { "type": "string" },
                    "url": { "type": "string" },
                    "filesChanged": { "type": "integer" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "send_message_to_ai",
            "Send message to AI",
            "Post a direct message to another identity's channel. Requires a resolved caller identity.",
            json!({
                "type": "object",
                "required": ["toAI", "message"],
                "properties": {
                    "toAI": { "type": "string", "enum": ["cursor", "codex", "replit"], "description": "Recipient identity." },
                    "message": { "type": "string" },
                    "urgent": { "type": "boolean", "description": "Flag the message as urgent.", "default": false }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "broadcast_to_coordination",
            "Broadcast to coordination",
            "Post a message to the shared coordination channel. Requires a resolved caller identity.",
            json!({
                "type": "object",
                "required": ["message"],
                "properties": {
                    "message": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "send_slack_message",
            "Send chat message",
            "Post raw text to one of the five well-known channels.",
            json!({
                "type": "object",
                "required": ["channel", "text"],
                "properties": {
                    "channel": { "type": "string", "enum": ["coordination", "cursor", "codex", "replit", "commits"] },
                    "text": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "get_project_status",
            "Get project status",
            "Counts of open tasks per status and per assignee.",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "claim_task",
            "Claim task",
            "Mark a task in-progress for the calling identity. Best-effort signal, not a lock: concurrent claimants can both succeed.",
            json!({
                "type": "object",
                "required": ["taskId"],
                "properties": {
                    "taskId": { "type": "integer", "description": "Tracker-assigned task id." }
                },
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "start_my_work",
            "Start my work",
            "Claim any one ready task assigned to the calling identity, under the tracker's natural ordering.",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        ),
        McpToolDef::new(
            "complete_and_handoff",
            "Complete and hand off",
            "Mark a task done, record a structured handoff comment, and notify the next identity.",
            json!({
                "type": "object",
                "required": ["nextAI"],
                "properties": {
                    "nextAI": { "type": "string", "enum": ["cursor", "codex", "replit"], "description": "Identity taking over." },
                    "taskId": { "type": "integer", "description": "Tracker-assigned task id. Required in practice — the daemon tracks no current task per identity." },
                    "message": { "type": "string", "description": "Handoff note for the next identity." }
                },
                "additionalProperties": false
            }),
        ),
    ]
}

/// Handle a `tools/list` request.
pub fn handle_tools_list() -> Value {
    json!({ "tools": catalogue() })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_complete_and_unique() {
        let tools = catalogue();
        assert_eq!(tools.len(), 16);
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 16, "duplicate tool names");
        for required in [
            "create_task",
            "get_my_tasks",
            "list_tasks",
            "update_task_status",
            "add_task_comment",
            "notify_task_complete",
            "notify_task_status",
            "notify_deployment",
            "notify_commit",
            "send_message_to_ai",
            "broadcast_to_coordination",
            "send_slack_message",
            "get_project_status",
            "claim_task",
            "start_my_work",
            "complete_and_handoff",
        ] {
            assert!(names.contains(&required), "missing tool {required}");
        }
    }

    #[test]
    fn every_schema_is_a_closed_object() {
        for tool in catalogue() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert_eq!(
                tool.input_schema["additionalProperties"], false,
                "{} must reject unknown fields",
                tool.name
            );
            assert!(!tool.description.is_empty());
        }
    }
}
