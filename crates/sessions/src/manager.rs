//! Gateway-owned session records.
//!
//! One record per live duplex connection. IDs are uuid v4 — unique for
//! the process lifetime and unguessable, so a stale or hostile client
//! cannot inject messages into another connection's session.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use adj_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

/// State for one live duplex connection and its authenticated
/// principal. At most one dispatch loop consumes a session; no session
/// outlives its connection.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub principal_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub state: SessionState,
    /// Conversation ID minted by the assistant engine for this
    /// connection, bound after the engine accepts the session.
    pub engine_session_id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionManager {
    max_sessions: usize,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for an authenticated principal.
    ///
    /// Fails only with [`Error::ResourceExhausted`] once `max_sessions`
    /// sessions are active.
    pub fn create(&self, principal_id: &str) -> Result<SessionRecord> {
        let mut sessions = self.sessions.write();

        let active = sessions
            .values()
            .filter(|s| s.state != SessionState::Closed)
            .count();
        if active >= self.max_sessions {
            return Err(Error::ResourceExhausted(format!(
                "session limit reached ({active}/{})",
                self.max_sessions
            )));
        }

        let now = Utc::now();
        let record = SessionRecord {
            session_id: uuid::Uuid::new_v4().to_string(),
            principal_id: principal_id.to_owned(),
            created_at: now,
            last_active: now,
            state: SessionState::Active,
            engine_session_id: None,
        };
        sessions.insert(record.session_id.clone(), record.clone());

        tracing::debug!(
            session_id = %record.session_id,
            principal_id = %principal_id,
            "session created"
        );
        Ok(record)
    }

    /// Bind the engine-side conversation ID to a session.
    pub fn bind_engine_session(&self, session_id: &str, engine_session_id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(s) = sessions.get_mut(session_id) {
            s.engine_session_id = Some(engine_session_id.to_owned());
        }
    }

    /// Mark a session as closing (teardown in progress).
    pub fn mark_closing(&self, session_id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(s) = sessions.get_mut(session_id) {
            if s.state == SessionState::Active {
                s.state = SessionState::Closing;
            }
        }
    }

    /// Close a session and release its bookkeeping. Idempotent: ending
    /// an already-closed or unknown session is a no-op.
    pub fn end(&self, session_id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(s) = sessions.get_mut(session_id) {
            if s.state != SessionState::Closed {
                s.state = SessionState::Closed;
                s.last_active = Utc::now();
                tracing::debug!(session_id = %session_id, "session closed");
            }
        }
    }

    /// Bump `last_active`; called once per dispatched message.
    pub fn touch(&self, session_id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(s) = sessions.get_mut(session_id) {
            s.last_active = Utc::now();
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn list(&self) -> Vec<SessionRecord> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|s| s.state == SessionState::Active)
            .count()
    }

    /// Reclaim sweep: close sessions idle beyond `idle_timeout` and
    /// evict closed records older than `closed_ttl`. Returns the number
    /// of sessions closed. This is the guaranteed cleanup path for
    /// loops that exited without reaching their own teardown.
    pub fn reclaim(&self, idle_timeout: Duration, closed_ttl: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();

        let mut closed = 0;
        for s in sessions.values_mut() {
            if s.state != SessionState::Closed && now - s.last_active > idle_timeout {
                s.state = SessionState::Closed;
                s.last_active = now;
                closed += 1;
                tracing::warn!(session_id = %s.session_id, "idle session reclaimed");
            }
        }

        sessions.retain(|_, s| {
            s.state != SessionState::Closed || now - s.last_active <= closed_ttl
        });

        closed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn concurrent_creates_yield_unique_ids() {
        let manager = Arc::new(SessionManager::new(1024));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    (0..32)
                        .map(|_| manager.create(&format!("user-{t}")).unwrap().session_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(ids.insert(id), "duplicate session id");
            }
        }
        assert_eq!(ids.len(), 256);

        for record in manager.list() {
            let t: &str = record.principal_id.strip_prefix("user-").unwrap();
            t.parse::<u8>().unwrap();
        }
    }

    #[test]
    fn create_fails_when_exhausted() {
        let manager = SessionManager::new(2);
        manager.create("a").unwrap();
        manager.create("a").unwrap();
        assert!(matches!(
            manager.create("a"),
            Err(Error::ResourceExhausted(_))
        ));

        // Ending a session frees a slot.
        let id = manager.list()[0].session_id.clone();
        manager.end(&id);
        manager.create("a").unwrap();
    }

    #[test]
    fn end_is_idempotent() {
        let manager = SessionManager::new(8);
        let record = manager.create("a").unwrap();

        manager.end(&record.session_id);
        manager.end(&record.session_id);
        manager.end("no-such-session");

        assert_eq!(
            manager.get(&record.session_id).unwrap().state,
            SessionState::Closed
        );
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn reclaim_closes_idle_and_evicts_closed() {
        let manager = SessionManager::new(8);
        let idle = manager.create("a").unwrap();
        let fresh = manager.create("b").unwrap();

        // Age the first session artificially.
        {
            let mut sessions = manager.sessions.write();
            let s = sessions.get_mut(&idle.session_id).unwrap();
            s.last_active = Utc::now() - Duration::seconds(3600);
        }

        let closed = manager.reclaim(Duration::seconds(900), Duration::seconds(300));
        assert_eq!(closed, 1);
        assert_eq!(
            manager.get(&idle.session_id).unwrap().state,
            SessionState::Closed
        );
        assert_eq!(
            manager.get(&fresh.session_id).unwrap().state,
            SessionState::Active
        );

        // Once past the TTL, the closed record is evicted entirely.
        {
            let mut sessions = manager.sessions.write();
            let s = sessions.get_mut(&idle.session_id).unwrap();
            s.last_active = Utc::now() - Duration::seconds(3600);
        }
        manager.reclaim(Duration::seconds(900), Duration::seconds(300));
        assert!(manager.get(&idle.session_id).is_none());
    }
}
