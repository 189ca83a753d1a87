//! Slack implementation of the Notification Gateway.
//!
//! One shared `reqwest::Client` reused across all sessions and operations —
//! sends are independent and never serialized against each other.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;

use crate::config::SlackConfig;
use crate::error::{CoordError, Result};

use super::{Channel, Notifier};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackNotifier {
    http: reqwest::Client,
    token: String,
    api_url: String,
    /// Channel → Slack channel id (or `#name`).
    destinations: HashMap<Channel, String>,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(cfg: &SlackConfig) -> Self {
        let mut destinations = HashMap::new();
        destinations.insert(Channel::Coordination, cfg.coordination_channel.clone());
        destinations.insert(Channel::Cursor, cfg.cursor_channel.clone());
        destinations.insert(Channel::Codex, cfg.codex_channel.clone());
        destinations.insert(Channel::Replit, cfg.replit_channel.clone());
        destinations.insert(Channel::Commits, cfg.commits_channel.clone());
        Self {
            http: reqwest::Client::new(),
            token: cfg.token.clone(),
            api_url: POST_MESSAGE_URL.to_string(),
            destinations,
        }
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn destination(&self, channel: Channel) -> &str {
        // Every Channel variant is inserted in new(); the map is total.
        self.destinations
            .get(&channel)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn post(&self, channel: Channel, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&json!({
                "channel": self.destination(channel),
                "text": text,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CoordError::upstream(format!(
                "chat gateway returned HTTP {}",
                resp.status()
            )));
        }

        // Slack reports API-level failures in-band with HTTP 200.
        let body: SlackResponse = resp
            .json()
            .await
            .map_err(|_| CoordError::upstream("malformed chat gateway response"))?;
        if !body.ok {
            return Err(CoordError::upstream(format!(
                "chat gateway rejected message: {}",
                body.error.as_deref().unwrap_or("unknown error")
            )));
        }
        Ok(())
    }
}
