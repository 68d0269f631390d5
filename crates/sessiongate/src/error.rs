//! Unified error types for Sessiongate.

use sessiongate_protocol::ProtocolError;
use sessiongate_session::SessionError;
use sessiongate_transport::TransportError;

/// Failure reported by business code: a handler callback that could not
/// complete.
///
/// The dispatchers never turn this into a response. The call is aborted,
/// the failure optionally reaches the handler's `log_exception` hook, and
/// nothing is written back.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A failure described by a message.
    #[error("{0}")]
    Failed(String),

    /// A failure caused by another error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps any error as [`HandlerError::Other`].
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

impl From<SessionError> for HandlerError {
    fn from(error: SessionError) -> Self {
        Self::other(error)
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `sessiongate` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A transport-level error (missing parameter, write failed).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (reserved attribute, not found).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A handler callback failed.
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::MissingParameter("request".into());
        let gateway_err: GatewayError = err.into();
        assert!(matches!(gateway_err, GatewayError::Transport(_)));
        assert!(gateway_err.to_string().contains("request"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let gateway_err: GatewayError = err.into();
        assert!(matches!(gateway_err, GatewayError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::ReservedAttribute("session_id".into());
        let gateway_err: GatewayError = err.into();
        assert!(matches!(gateway_err, GatewayError::Session(_)));
    }

    #[test]
    fn test_from_handler_error_keeps_message() {
        let gateway_err: GatewayError = HandlerError::failed("db offline").into();
        assert!(matches!(gateway_err, GatewayError::Handler(_)));
        assert_eq!(gateway_err.to_string(), "handler failed: db offline");
    }

    #[test]
    fn test_handler_error_from_session_error_is_other() {
        let err: HandlerError = SessionError::ReservedAttribute("permissions".into()).into();
        assert!(matches!(err, HandlerError::Other(_)));
        assert!(err.to_string().contains("permissions"));
    }
}
