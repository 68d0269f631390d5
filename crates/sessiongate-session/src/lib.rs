//! Session management for Sessiongate.
//!
//! This crate holds the shared, mutable state every dispatcher call and the
//! background sweeper work on:
//!
//! 1. **Identity** ([`SessionId`]): opaque random ids handed out at login.
//! 2. **State** ([`SessionHandle`]): attributes plus the last-access time,
//!    each session behind its own lock.
//! 3. **Registry** ([`SessionStore`]): the concurrent id → session map.
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatchers (above)  ← resolve, touch and create sessions per call
//! Sweeper (beside)     ← evicts sessions idle for too long
//!     ↕
//! Session Layer (this crate)
//! ```

mod error;
mod session;
mod store;

pub use error::SessionError;
pub use session::{
    Attributes, PERMISSIONS_ATTRIBUTE, SESSION_ID_ATTRIBUTE, Session, SessionConfig, SessionHandle,
    SessionId, is_reserved,
};
pub use store::SessionStore;
