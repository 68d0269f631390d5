//! Business-logic traits plugged into the dispatchers.
//!
//! A service implements [`OperationHandler`] for its regular operations and
//! [`LoginHandler`] for its login endpoint. The dispatchers own everything
//! around the handler: decoding, session resolution, permission gating,
//! finalizing the response and writing it out.
//!
//! The logging hooks have default implementations that emit `tracing`
//! events. Override them to send records somewhere else (an audit table,
//! a metrics pipe). They return `()`: a failing hook can't disturb the call.

use std::future::Future;

use sessiongate_protocol::{Request, Response};
use sessiongate_session::SessionHandle;

use crate::{GatewayError, HandlerError};

/// Handler for session-gated operations.
///
/// # Example
///
/// ```rust,ignore
/// struct Notes;
///
/// impl OperationHandler for Notes {
///     async fn process(
///         &self,
///         request: &Request,
///         session: Option<&SessionHandle>,
///     ) -> Result<Response, HandlerError> {
///         Ok(Response::success(json!({ "method": request.method })))
///     }
///
///     fn check_permissions(&self, permissions: &[String], _request: &Request) -> bool {
///         permissions.iter().any(|p| p == "notes")
///     }
/// }
/// ```
pub trait OperationHandler: Send + Sync + 'static {
    /// Runs the operation.
    ///
    /// `session` is the resolved session when the session check is on, and
    /// `None` when it is off. Return [`Response::error`] for a business-level
    /// failure the caller should see. The dispatcher fills in `id` and
    /// `method` and normalizes the status afterwards.
    ///
    /// # Errors
    /// Return `Err` when the operation could not run at all. The call is
    /// aborted and no response is written.
    fn process(
        &self,
        request: &Request,
        session: Option<&SessionHandle>,
    ) -> impl Future<Output = Result<Response, HandlerError>> + Send;

    /// Decides whether a session holding `permissions` may run `request`.
    fn check_permissions(&self, permissions: &[String], request: &Request) -> bool;

    /// Called exactly once when a request presents no usable session.
    fn on_no_session(&self, request: &Request) {
        tracing::debug!(id = %request.id, method = %request.method, "request without valid session");
    }

    /// Called after a successful operation when operation logging is on.
    fn log_success(&self, request: &Request, response: &Response, session: Option<&SessionHandle>) {
        tracing::info!(
            id = %request.id,
            method = %request.method,
            session_id = session.map(|s| s.id().as_str()),
            status = %response.status(),
            "operation succeeded"
        );
    }

    /// Called after an operation answered with ERROR when operation logging
    /// is on.
    fn log_error_response(&self, request: &Request, response: &Response, session: Option<&SessionHandle>) {
        tracing::info!(
            id = %request.id,
            method = %request.method,
            session_id = session.map(|s| s.id().as_str()),
            error = response.error_message(),
            "operation answered with error"
        );
    }

    /// Called when the pipeline aborts and error logging is on.
    ///
    /// `request` is `None` when the failure happened before decoding
    /// finished.
    fn log_exception(&self, request: Option<&Request>, error: &GatewayError) {
        tracing::warn!(
            method = request.map(|r| r.method.as_str()),
            error = %error,
            "operation aborted"
        );
    }
}

/// Handler for the login endpoint.
///
/// On success the dispatcher creates the session, then calls
/// [`seed`](Self::seed) and [`resolve_permissions`](Self::resolve_permissions)
/// to fill it in.
pub trait LoginHandler: Send + Sync + 'static {
    /// Verifies the credentials carried by `request`.
    ///
    /// # Errors
    /// `Err` aborts the login with no response. A plain refusal is
    /// `Ok(false)`.
    fn authenticate(&self, request: &Request) -> impl Future<Output = Result<bool, HandlerError>> + Send;

    /// Stores business attributes in the new session.
    ///
    /// # Errors
    /// `Err` aborts the login; the half-built session is removed.
    fn seed(&self, request: &Request, session: &SessionHandle) -> Result<(), HandlerError>;

    /// The permission tokens the authenticated caller holds, in order.
    ///
    /// # Errors
    /// `Err` aborts the login; the half-built session is removed.
    fn resolve_permissions(&self, request: &Request) -> Result<Vec<String>, HandlerError>;

    /// Called after a successful login when operation logging is on.
    fn log_success(&self, request: &Request, response: &Response, session: Option<&SessionHandle>) {
        tracing::info!(
            id = %request.id,
            status = %response.status(),
            session_id = session.map(|s| s.id().as_str()),
            "login succeeded"
        );
    }

    /// Called after a refused login when operation logging is on.
    fn log_error_response(&self, request: &Request, response: &Response, _session: Option<&SessionHandle>) {
        tracing::info!(id = %request.id, error = response.error_message(), "login refused");
    }

    /// Called when the pipeline aborts and error logging is on.
    fn log_exception(&self, request: Option<&Request>, error: &GatewayError) {
        tracing::warn!(id = request.map(|r| r.id.as_str()), error = %error, "login aborted");
    }
}
