//! The session store: the registry of every live session.
//!
//! This is the piece every other component shares. It's responsible for:
//! - Creating sessions with fresh, unique ids at login
//! - Resolving ids presented by callers
//! - Resetting idle clocks on use
//! - Removing sessions, on request or when the sweeper finds them idle
//!
//! # Concurrency note
//!
//! The store is shared through an `Arc` by many request-handling tasks and
//! the sweeper. The map sits behind a `parking_lot::RwLock`: lookups take
//! the read side, creation and removal the write side. Each session carries
//! its own mutex, so touching or mutating one session never blocks calls
//! working on another. No lock here is ever held across an `.await`; every
//! method is synchronous and returns quickly.
//!
//! Lock order is always map first, then session. The sweeper relies on that
//! in [`SessionStore::remove_if_idle`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::{SessionHandle, SessionId};

/// Concurrent map from [`SessionId`] to [`SessionHandle`].
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ get() / touch() ... ──→ remove()
///                                  └──→ remove_if_idle()   (sweeper)
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a fresh id and no attributes.
    ///
    /// The id is regenerated until it doesn't collide with a live session.
    /// With 128 random bits a retry is practically never needed, but the
    /// check runs under the write lock so uniqueness holds regardless.
    pub fn create(&self) -> SessionHandle {
        let mut sessions = self.sessions.write();
        let id = loop {
            let candidate = SessionId::generate();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!("session id collision, regenerating");
        };

        let handle = SessionHandle::new(id.clone());
        sessions.insert(id, handle.clone());
        let live = sessions.len();
        drop(sessions);

        tracing::info!(session_id = %handle.id(), live, "session created");
        handle
    }

    /// Looks up a live session.
    pub fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.get_str(id.as_str())
    }

    /// Looks up a live session by the raw id string a caller sent.
    pub fn get_str(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Resets a session's idle clock.
    ///
    /// Returns `false` (and does nothing) if no such session exists.
    pub fn touch(&self, id: &SessionId) -> bool {
        match self.get(id) {
            Some(handle) => {
                handle.touch();
                true
            }
            None => false,
        }
    }

    /// Removes a session, returning its handle if it was live.
    ///
    /// Idempotent: removing an unknown or already-removed id returns `None`.
    pub fn remove(&self, id: &SessionId) -> Option<SessionHandle> {
        let removed = self.sessions.write().remove(id.as_str());
        if removed.is_some() {
            tracing::info!(session_id = %id, "session removed");
        }
        removed
    }

    /// Removes a session only if it has been idle longer than `threshold`.
    ///
    /// The idle duration is re-read while the map's write lock is held, so
    /// a session touched after the caller decided to evict it survives.
    /// Returns `true` if the session was removed.
    pub fn remove_if_idle(&self, id: &SessionId, threshold: Duration) -> bool {
        let mut sessions = self.sessions.write();
        let idle = match sessions.get(id.as_str()) {
            Some(handle) => handle.idle_duration(),
            None => return false,
        };
        if idle <= threshold {
            return false;
        }
        sessions.remove(id.as_str());
        drop(sessions);

        tracing::info!(session_id = %id, idle_ms = idle.as_millis() as u64, "idle session evicted");
        true
    }

    /// Idle duration of every live session.
    ///
    /// Taken under the map's read lock, with each timestamp read under its
    /// session's lock, so no entry is torn. Sessions created or removed
    /// after the call returns are of course not reflected.
    pub fn snapshot_idle_durations(&self) -> Vec<(SessionId, Duration)> {
        self.sessions
            .read()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.idle_duration()))
            .collect()
    }

    /// Ids of all live sessions, in arbitrary order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
