//! Dispatcher configuration.
//!
//! Both structs are plain values fixed when a dispatcher is built. They
//! derive serde with `#[serde(default)]`, so a config file only needs the
//! fields it wants to change.

use serde::{Deserialize, Serialize};

/// Error message of a response whose permission check failed.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

/// Default error message of a failed login.
pub const DEFAULT_NOT_CORRECT_MESSAGE: &str = "The user and/or password provided are not correct.";

/// Settings for an [`AuthDispatcher`](crate::AuthDispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Require a live session whose echo matches the presented id.
    /// Default: `true`.
    pub session_check: bool,

    /// Ask the handler to approve the session's permissions before
    /// processing. Only applies when a session was resolved.
    /// Default: `true`.
    pub permission_check: bool,

    /// Call `log_success` / `log_error_response` after processing.
    /// Default: `false`.
    pub operation_logging: bool,

    /// Call `log_exception` when the pipeline aborts.
    /// Default: `false`.
    pub error_logging: bool,

    /// Decode the raw request parameter as UTF-8 instead of ISO-8859-1.
    /// Default: `false`.
    pub request_encoding_utf8: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            session_check: true,
            permission_check: true,
            operation_logging: false,
            error_logging: false,
            request_encoding_utf8: false,
        }
    }
}

/// Settings for a [`LoginDispatcher`](crate::LoginDispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Call `log_success` / `log_error_response` after the login decision.
    pub operation_logging: bool,

    /// Call `log_exception` when the pipeline aborts.
    pub error_logging: bool,

    /// Decode the raw request parameter as UTF-8 instead of ISO-8859-1.
    pub request_encoding_utf8: bool,

    /// Error message sent back when authentication is refused.
    pub not_correct_message: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            operation_logging: false,
            error_logging: false,
            request_encoding_utf8: false,
            not_correct_message: DEFAULT_NOT_CORRECT_MESSAGE.to_string(),
        }
    }
}
