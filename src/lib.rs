//! coordd — multi-agent task coordination daemon.
//!
//! Coordinates work across autonomous AI agents that share no process and no
//! database: a remote issue tracker is the system of record, chat is a
//! best-effort notification side channel, and this daemon exposes the
//! claim/start/handoff workflow as a fixed catalogue of schema-typed tools
//! over stdio and HTTP.

pub mod config;
pub mod error;
pub mod identity;
pub mod mcp;
pub mod notify;
pub mod orchestrator;
pub mod rest;
pub mod tracker;

use std::sync::Arc;
use std::time::Instant;

use config::CoordConfig;
use mcp::SessionRegistry;
use notify::Notifier;
use orchestrator::TaskOrchestrator;
use tracker::TaskTracker;

/// Shared state handed to every transport and route handler.
pub struct AppContext {
    pub config: Arc<CoordConfig>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub sessions: Arc<SessionRegistry>,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(
        config: CoordConfig,
        tracker: Arc<dyn TaskTracker>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let orchestrator = Arc::new(TaskOrchestrator::new(tracker, notifier.clone()));
        Self {
            config: Arc::new(config),
            orchestrator,
            notifier,
            sessions: Arc::new(SessionRegistry::new()),
            started_at: Instant::now(),
        }
    }
}
