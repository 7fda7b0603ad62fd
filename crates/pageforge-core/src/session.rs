//! Server-side login sessions.
//!
//! Only authenticated sessions are stored; a request without a live entry is
//! treated as logged out. Each session carries its own CSRF token, issued at
//! login and checked on every mutating admin request.
//!
//! # Security model
//!
//! - Session ids and CSRF tokens are 256-bit random values (hex-encoded).
//! - Logging in always issues a fresh id and destroys the presented one, so a
//!   session id fixed before login is worthless afterwards.
//! - Sessions expire after a period of inactivity; expired entries are
//!   removed on access and by [`SessionStore::purge_expired`].
//! - CSRF tokens are compared in constant time.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::crypto;
use crate::users::Role;

/// A logged-in session.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub csrf_token: String,
    pub last_seen: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &"[REDACTED]")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("csrf_token", &"[REDACTED]")
            .field("last_seen", &self.last_seen)
            .finish()
    }
}

impl Session {
    /// Whether `submitted` matches this session's CSRF token.
    #[must_use]
    pub fn verify_csrf(&self, submitted: &str) -> bool {
        verify_csrf(&self.csrf_token, submitted)
    }
}

/// Constant-time comparison of a CSRF token against the expected value.
///
/// An empty expected token never matches.
#[must_use]
pub fn verify_csrf(expected: &str, submitted: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// In-memory session table.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: TimeDelta,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `ttl` of inactivity.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Start a session for a freshly authenticated user.
    ///
    /// `previous` is whatever session id the client presented; it is
    /// destroyed so the new session never reuses it.
    pub async fn login(&self, previous: Option<&str>, username: &str, role: Role) -> Session {
        let now = Utc::now();
        let session = Session {
            id: crypto::random_token(),
            username: username.to_owned(),
            role,
            csrf_token: crypto::random_token(),
            last_seen: now,
        };

        let mut sessions = self.sessions.write().await;
        if let Some(old) = previous {
            sessions.remove(old);
        }
        sessions.insert(session.id.clone(), session.clone());
        drop(sessions);

        info!(username, role = %role, "session started");
        session
    }

    /// Look up a live session and refresh its idle timer.
    ///
    /// An expired session is removed and reported as absent.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;

        if self.is_expired(session, now) {
            let username = session.username.clone();
            sessions.remove(id);
            debug!(username = %username, "session expired on access");
            return None;
        }

        session.last_seen = now;
        Some(session.clone())
    }

    /// End a session. Returns whether it existed.
    pub async fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            info!(username = %session.username, "session ended");
        }
        removed.is_some()
    }

    /// Remove every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before.saturating_sub(sessions.len())
    }

    /// Number of stored sessions, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.last_seen) > self.ttl
    }
}
