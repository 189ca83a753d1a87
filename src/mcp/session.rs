//! Session registry for the multiplexed HTTP transport.
//!
//! A session is minted on `initialize` and identified by an opaque token the
//! client echoes back in the `Mcp-Session-Id` header. Sessions are
//! independent: each carries its own broadcast channel for server-initiated
//! notices, and a fault in one never touches another. The stdio transport
//! bypasses this registry entirely — its lifetime *is* its session.
//!
//! Sessions end two ways: the client terminates its own with `DELETE /mcp`,
//! or the registry evicts it after [`SESSION_IDLE_TTL`] without traffic.
//! Eviction runs lazily on the next mint, so an abandoned client that loops
//! `initialize` still cleans up after itself.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Per-session notice buffer depth. A slow SSE consumer that falls further
/// behind loses the oldest notices, never blocks the sender.
const NOTICE_BUFFER: usize = 64;

/// Idle time after which a session is eligible for eviction. Any POST on the
/// session resets the clock.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

struct Session {
    notices: broadcast::Sender<String>,
    last_seen: Instant,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new session and return its token. Sessions idle past
    /// [`SESSION_IDLE_TTL`] are evicted here, so the registry never grows
    /// past the set of recently-active clients.
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        if let Ok(mut sessions) = self.sessions.write() {
            let before = sessions.len();
            sessions.retain(|_, s| s.last_seen.elapsed() < SESSION_IDLE_TTL);
            let evicted = before - sessions.len();
            if evicted > 0 {
                debug!(evicted, "evicted idle sessions");
            }
            sessions.insert(
                token.clone(),
                Session {
                    notices,
                    last_seen: Instant::now(),
                },
            );
        }
        debug!(session = %token, "session created");
        token
    }

    pub fn contains(&self, token: &str) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(token))
            .unwrap_or(false)
    }

    /// Mark a session as seen and report whether it exists. The transport
    /// calls this per request so active sessions never hit the idle TTL.
    pub fn touch(&self, token: &str) -> bool {
        if let Ok(mut sessions) = self.sessions.write() {
            if let Some(session) = sessions.get_mut(token) {
                session.last_seen = Instant::now();
                return true;
            }
        }
        false
    }

    /// Terminate a session, dropping its notice channel (open SSE streams
    /// end). Returns false for an unknown token.
    pub fn remove(&self, token: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .map(|mut s| s.remove(token).is_some())
            .unwrap_or(false);
        if removed {
            debug!(session = %token, "session terminated");
        }
        removed
    }

    #[cfg(test)]
    fn backdate(&self, token: &str, age: Duration) {
        if let Ok(mut sessions) = self.sessions.write() {
            if let Some(session) = sessions.get_mut(token) {
                session.last_seen = Instant::now() - age;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Queue a server-initiated notice for one session. A notice for an
    /// unknown session, or one with no connected listener, is dropped —
    /// notices are advisory, not part of any call's result.
    pub fn notice(&self, token: &str, payload: String) {
        if let Ok(sessions) = self.sessions.read() {
            if let Some(session) = sessions.get(token) {
                let _ = session.notices.send(payload);
            }
        }
    }

    /// Subscribe to a session's notice stream (SSE side). `None` for an
    /// unknown token.
    pub fn subscribe(&self, token: &str) -> Option<broadcast::Receiver<String>> {
        self.sessions
            .read()
            .ok()
            .and_then(|s| s.get(token).map(|sess| sess.notices.subscribe()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_registered() {
        let reg = SessionRegistry::new();
        let a = reg.create();
        let b = reg.create();
        assert_ne!(a, b);
        assert!(reg.contains(&a));
        assert!(reg.contains(&b));
        assert!(!reg.contains("nope"));
        assert_eq!(reg.count(), 2);
    }

    #[tokio::test]
    async fn notices_reach_only_their_session() {
        let reg = SessionRegistry::new();
        let a = reg.create();
        let b = reg.create();

        let mut rx_a = reg.subscribe(&a).unwrap();
        let mut rx_b = reg.subscribe(&b).unwrap();

        reg.notice(&a, "hello a".into());
        assert_eq!(rx_a.recv().await.unwrap(), "hello a");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn notice_to_unknown_session_is_dropped() {
        let reg = SessionRegistry::new();
        reg.notice("ghost", "lost".into());
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn remove_drops_the_session_and_closes_its_stream() {
        let reg = SessionRegistry::new();
        let a = reg.create();
        let mut rx = reg.subscribe(&a).unwrap();

        assert!(reg.remove(&a));
        assert!(!reg.contains(&a));
        assert!(!reg.remove(&a));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn idle_sessions_are_evicted_on_the_next_mint() {
        let reg = SessionRegistry::new();
        let stale = reg.create();
        reg.backdate(&stale, SESSION_IDLE_TTL + Duration::from_secs(1));

        let fresh = reg.create();
        assert!(!reg.contains(&stale));
        assert!(reg.contains(&fresh));
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn touch_resets_the_idle_clock() {
        let reg = SessionRegistry::new();
        let a = reg.create();
        reg.backdate(&a, SESSION_IDLE_TTL + Duration::from_secs(1));

        assert!(reg.touch(&a));
        reg.create();
        assert!(reg.contains(&a));
        assert!(!reg.touch("nope"));
    }
}
