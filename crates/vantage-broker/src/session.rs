//! Session table: the single source of truth for session topology.
//!
//! All mutation happens under one write lock, so create/join/remove are
//! serialized and two racing joins on the same token resolve to exactly
//! one winner.

use std::collections::HashMap;

use tokio::sync::RwLock;

use vantage_common::{new_session_token, BrokerError, ConnectionId, Result};

/// Bounded retries for short-token collisions before giving up.
const MAX_TOKEN_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Terminated,
}

/// One host/viewer pairing. Holds connection ids only; the registry owns
/// the actual transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub host: ConnectionId,
    pub viewer: Option<ConnectionId>,
    pub state: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Viewer,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    /// Back-references for O(1) disconnect cleanup. A connection hosts at
    /// most one session and views at most one, so these are plain maps.
    hosting: HashMap<ConnectionId, String>,
    viewing: HashMap<ConnectionId, String>,
}

pub struct SessionTable {
    inner: RwLock<Inner>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Create a session with `host` as its host. Returns the new token.
    pub async fn create_session(&self, host: ConnectionId) -> Result<String> {
        let mut inner = self.inner.write().await;

        if inner.hosting.contains_key(&host) {
            return Err(BrokerError::UnauthorizedRole(
                "connection already hosts a session".into(),
            ));
        }

        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = new_session_token();
            if inner.sessions.contains_key(&token) {
                continue;
            }
            inner.sessions.insert(
                token.clone(),
                Session {
                    host,
                    viewer: None,
                    state: SessionState::Created,
                },
            );
            inner.hosting.insert(host, token.clone());
            return Ok(token);
        }

        Err(BrokerError::InternalError(
            "session token space exhausted".into(),
        ))
    }

    /// Join `viewer` into the session identified by `token`, moving it to
    /// `Active`. Returns the host's connection id so the caller can notify
    /// it. Exactly one of two concurrent joins can succeed; the loser sees
    /// `SessionFull`.
    pub async fn join_session(&self, token: &str, viewer: ConnectionId) -> Result<ConnectionId> {
        let mut inner = self.inner.write().await;

        if inner.viewing.contains_key(&viewer) {
            return Err(BrokerError::UnauthorizedRole(
                "connection already views a session".into(),
            ));
        }

        let session = inner
            .sessions
            .get(token)
            .copied()
            .ok_or_else(|| BrokerError::SessionNotFound(token.to_string()))?;

        if session.host == viewer {
            return Err(BrokerError::UnauthorizedRole(
                "cannot join a session as its own host".into(),
            ));
        }
        if session.viewer.is_some() {
            return Err(BrokerError::SessionFull(token.to_string()));
        }

        let entry = inner
            .sessions
            .get_mut(token)
            .ok_or_else(|| BrokerError::SessionNotFound(token.to_string()))?;
        entry.viewer = Some(viewer);
        entry.state = SessionState::Active;
        let host = entry.host;
        inner.viewing.insert(viewer, token.to_string());

        Ok(host)
    }

    /// Look up a live session. Terminated sessions are evicted on removal,
    /// so `None` covers both "unknown" and "already torn down".
    pub async fn lookup(&self, token: &str) -> Option<Session> {
        self.inner.read().await.sessions.get(token).copied()
    }

    /// Resolve the role `conn` plays in the session, if any.
    pub fn role_of(session: &Session, conn: ConnectionId) -> Option<Role> {
        if session.host == conn {
            Some(Role::Host)
        } else if session.viewer == Some(conn) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Evict every session `conn` participates in (as host or viewer) and
    /// return the terminated snapshots. Empty on repeat calls.
    pub async fn remove_by_connection(&self, conn: ConnectionId) -> Vec<(String, Session)> {
        let mut inner = self.inner.write().await;

        let mut tokens = Vec::with_capacity(2);
        if let Some(token) = inner.hosting.get(&conn) {
            tokens.push(token.clone());
        }
        if let Some(token) = inner.viewing.get(&conn) {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }

        let mut removed = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Some(mut session) = inner.sessions.remove(&token) {
                inner.hosting.remove(&session.host);
                if let Some(viewer) = session.viewer {
                    inner.viewing.remove(&viewer);
                }
                session.state = SessionState::Terminated;
                removed.push((token, session));
            }
        }
        removed
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
