//! Session types: identifiers, the attribute map, and the live handle.
//!
//! A session is the server's record of an authenticated caller. It tracks:
//! - WHO it is (`SessionId`, handed to the caller at login)
//! - WHAT the caller may do and what business state it carries (attributes)
//! - WHEN it was last used (so the sweeper knows when to evict it)

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::SessionError;

/// Attribute key holding the session-id echo written at login.
///
/// The dispatcher compares it with the id a request presents; a mismatch is
/// treated exactly like an unknown session.
pub const SESSION_ID_ATTRIBUTE: &str = "session_id";

/// Attribute key holding the ordered list of permission tokens.
pub const PERMISSIONS_ATTRIBUTE: &str = "permissions";

/// Returns `true` for keys only the pipeline may write.
pub fn is_reserved(key: &str) -> bool {
    key == SESSION_ID_ATTRIBUTE || key == PERMISSIONS_ATTRIBUTE
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing knobs for sessions.
///
/// Both values are milliseconds so the struct maps one-to-one onto a config
/// file section. Missing fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session may sit unused before the sweeper evicts it.
    ///
    /// Default: 60 000 ms.
    pub session_idle_timeout_ms: u64,

    /// How often the sweeper scans the store.
    ///
    /// Default: 60 000 ms.
    pub sweep_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_idle_timeout_ms: 60_000,
            sweep_interval_ms: 60_000,
        }
    }
}

impl SessionConfig {
    /// The idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.session_idle_timeout_ms)
    }

    /// The sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque session identifier.
///
/// Generated ids are 128 random bits rendered as 32 lowercase hex
/// characters. Ids presented by callers are whatever string they sent; the
/// store decides whether they name a live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets the store look entries up by `&str` without allocating.
impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// A session's attribute map.
///
/// Reads are unrestricted. Writes through [`insert`](Self::insert) and
/// [`remove`](Self::remove) refuse the reserved keys, so handler code can
/// never clobber the session-id echo or the permission list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: HashMap<String, Value>,
}

impl Attributes {
    /// Looks up a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets a value, returning the previous one.
    ///
    /// # Errors
    /// [`SessionError::ReservedAttribute`] for a reserved key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, SessionError> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(SessionError::ReservedAttribute(key));
        }
        Ok(self.entries.insert(key, value))
    }

    /// Removes a value, returning it if it was present.
    ///
    /// # Errors
    /// [`SessionError::ReservedAttribute`] for a reserved key.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, SessionError> {
        if is_reserved(key) {
            return Err(SessionError::ReservedAttribute(key.to_string()));
        }
        Ok(self.entries.remove(key))
    }

    /// Number of attributes, reserved ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all key/value pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn put_reserved(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }
}

// ---------------------------------------------------------------------------
// Session (snapshot)
// ---------------------------------------------------------------------------

/// A point-in-time copy of a session.
///
/// Taken under the session's lock, so every field belongs to the same
/// moment. Changing the snapshot does not change the live session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The session's id.
    pub id: SessionId,

    /// All attributes at snapshot time.
    pub attributes: Attributes,

    /// When the session was last used.
    pub last_access: Instant,

    /// When the session was created.
    pub created_at: Instant,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SessionCell {
    id: SessionId,
    created_at: Instant,
    state: Mutex<CellState>,
}

#[derive(Debug)]
struct CellState {
    attributes: Attributes,
    last_access: Instant,
}

/// A shared handle to one live session.
///
/// Cloning is cheap (an `Arc` bump). Every method takes the session's own
/// lock for the duration of the call and releases it before returning, so
/// a handle can be used freely across `.await` points.
///
/// The store owns the map entry. A handle obtained before the session was
/// removed keeps working, but the store no longer knows about it: later
/// lookups by id return `None`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cell: Arc<SessionCell>,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            cell: Arc::new(SessionCell {
                id,
                created_at: now,
                state: Mutex::new(CellState {
                    attributes: Attributes::default(),
                    last_access: now,
                }),
            }),
        }
    }

    /// The session's id.
    pub fn id(&self) -> &SessionId {
        &self.cell.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> Instant {
        self.cell.created_at
    }

    /// When the session was last used.
    pub fn last_access(&self) -> Instant {
        self.cell.state.lock().last_access
    }

    /// Time elapsed since the last use.
    pub fn idle_duration(&self) -> Duration {
        let last = self.cell.state.lock().last_access;
        Instant::now().saturating_duration_since(last)
    }

    /// Resets the idle clock.
    pub fn touch(&self) {
        self.cell.state.lock().last_access = Instant::now();
    }

    /// Reads one attribute.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.cell.state.lock().attributes.get(key).cloned()
    }

    /// Reads one attribute as a string.
    pub fn attribute_str(&self, key: &str) -> Option<String> {
        self.cell
            .state
            .lock()
            .attributes
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// Sets one attribute.
    ///
    /// # Errors
    /// [`SessionError::ReservedAttribute`] for a reserved key.
    pub fn set_attribute(
        &self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, SessionError> {
        self.cell.state.lock().attributes.insert(key, value)
    }

    /// Removes one attribute.
    ///
    /// # Errors
    /// [`SessionError::ReservedAttribute`] for a reserved key.
    pub fn remove_attribute(&self, key: &str) -> Result<Option<Value>, SessionError> {
        self.cell.state.lock().attributes.remove(key)
    }

    /// Runs `f` with exclusive access to the attribute map.
    ///
    /// Everything `f` does happens under one lock acquisition, so other
    /// callers observe either none or all of its writes. Keep `f` short; it
    /// must not block or call back into this handle.
    pub fn update<R>(&self, f: impl FnOnce(&mut Attributes) -> R) -> R {
        f(&mut self.cell.state.lock().attributes)
    }

    /// A full copy of the attribute map.
    pub fn attributes(&self) -> Attributes {
        self.cell.state.lock().attributes.clone()
    }

    /// A consistent copy of the whole session.
    pub fn snapshot(&self) -> Session {
        let state = self.cell.state.lock();
        Session {
            id: self.cell.id.clone(),
            attributes: state.attributes.clone(),
            last_access: state.last_access,
            created_at: self.cell.created_at,
        }
    }

    /// The session-id echo, if one was stamped.
    pub fn session_id_echo(&self) -> Option<String> {
        self.attribute_str(SESSION_ID_ATTRIBUTE)
    }

    /// Writes the session-id echo.
    ///
    /// The login pipeline stamps the session's own id here. Any other value
    /// makes every later request presenting this id look session-less.
    pub fn stamp_session_id(&self, echo: &str) {
        self.cell
            .state
            .lock()
            .attributes
            .put_reserved(SESSION_ID_ATTRIBUTE, Value::String(echo.to_string()));
    }

    /// The permission tokens granted at login, in order.
    ///
    /// A missing attribute reads as an empty list. Non-string entries are
    /// skipped.
    pub fn permissions(&self) -> Vec<String> {
        let state = self.cell.state.lock();
        match state.attributes.get(PERMISSIONS_ATTRIBUTE) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Stores the permission tokens, replacing any previous list.
    pub fn grant_permissions(&self, permissions: Vec<String>) {
        let list = Value::Array(permissions.into_iter().map(Value::String).collect());
        self.cell
            .state
            .lock()
            .attributes
            .put_reserved(PERMISSIONS_ATTRIBUTE, list);
    }

    /// Returns `true` if both handles point at the same session.
    pub fn ptr_eq(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}
