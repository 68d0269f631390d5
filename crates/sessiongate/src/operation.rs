//! The session-gated dispatcher for regular operations.
//!
//! Every call walks the same stages:
//!
//! ```text
//! DECODING ──→ SESSION_CHECK ──→ PERMISSION_CHECK ──→ PROCESSING ──→ RESPONDING
//!    │               │                  │                  │
//!    ▼               ▼                  ▼                  ▼
//! DecodeFailed   NoSession           Denied          HandlerFailed
//! (no response)  (NO_SESSION)        (ERROR)         (no response)
//! ```
//!
//! The session check resolves the presented id and compares it with the
//! session's echo attribute; a mismatch counts as no session. The idle clock
//! is reset only once the session has passed the permission check, before
//! the handler runs.

use std::sync::Arc;

use sessiongate_protocol::{Codec, JsonCodec, Request, Response, Status};
use sessiongate_session::{SessionHandle, SessionStore};
use sessiongate_transport::{CallId, RequestParams, ResponseSink};

use crate::dispatch::{DispatchOutcome, decode_call, respond};
use crate::{ACCESS_DENIED_MESSAGE, DispatchConfig, GatewayError, OperationHandler};

/// Dispatcher that gates an [`OperationHandler`] behind sessions and
/// permissions.
///
/// Cheap to share: wrap it in an `Arc` and call
/// [`dispatch`](Self::dispatch) from as many tasks as needed.
pub struct AuthDispatcher<H, C = JsonCodec> {
    store: Arc<SessionStore>,
    handler: H,
    codec: C,
    config: DispatchConfig,
}

impl<H: OperationHandler> AuthDispatcher<H, JsonCodec> {
    /// Creates a dispatcher speaking JSON.
    pub fn new(store: Arc<SessionStore>, handler: H, config: DispatchConfig) -> Self {
        Self::with_codec(store, handler, JsonCodec, config)
    }
}

impl<H: OperationHandler, C: Codec> AuthDispatcher<H, C> {
    /// Creates a dispatcher with a custom codec.
    pub fn with_codec(store: Arc<SessionStore>, handler: H, codec: C, config: DispatchConfig) -> Self {
        Self {
            store,
            handler,
            codec,
            config,
        }
    }

    /// The dispatcher's configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The session store this dispatcher consults.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Runs one call through the pipeline and writes the answer to `sink`.
    #[tracing::instrument(name = "operation", skip_all, fields(call = %CallId::next()))]
    pub async fn dispatch<S: ResponseSink>(&self, params: &RequestParams, sink: &mut S) -> DispatchOutcome {
        let outcome = self.run(params, sink).await;
        tracing::debug!(?outcome, "operation call finished");
        outcome
    }

    async fn run<S: ResponseSink>(&self, params: &RequestParams, sink: &mut S) -> DispatchOutcome {
        // --- DECODING ---
        let request = match decode_call(&self.codec, params, self.config.request_encoding_utf8) {
            Ok(request) => request,
            Err(e) => {
                self.abort(None, &e);
                return DispatchOutcome::DecodeFailed;
            }
        };
        tracing::debug!(id = %request.id, method = %request.method, "request decoded");

        // --- SESSION_CHECK ---
        let session = if self.config.session_check {
            match self.resolve_session(&request) {
                Some(session) => Some(session),
                None => {
                    self.handler.on_no_session(&request);
                    let response = Response::reject(&request, Status::NoSession, None);
                    return self
                        .finish(&request, &response, sink, DispatchOutcome::NoSession)
                        .await;
                }
            }
        } else {
            None
        };

        // --- PERMISSION_CHECK ---
        if let Some(session) = &session {
            if self.config.permission_check
                && !self.handler.check_permissions(&session.permissions(), &request)
            {
                tracing::debug!(session_id = %session.id(), method = %request.method, "access denied");
                let response =
                    Response::reject(&request, Status::Error, Some(ACCESS_DENIED_MESSAGE.to_string()));
                return self
                    .finish(&request, &response, sink, DispatchOutcome::Denied)
                    .await;
            }
            session.touch();
        }

        // --- PROCESSING ---
        let response = match self.handler.process(&request, session.as_ref()).await {
            Ok(response) => response.answer(&request),
            Err(e) => {
                self.abort(Some(&request), &GatewayError::from(e));
                return DispatchOutcome::HandlerFailed;
            }
        };

        // --- RESPONDING ---
        let status = response.status();
        if self.config.operation_logging {
            match status {
                Status::Error => self
                    .handler
                    .log_error_response(&request, &response, session.as_ref()),
                _ => self.handler.log_success(&request, &response, session.as_ref()),
            }
        }
        self.finish(&request, &response, sink, DispatchOutcome::Completed(status))
            .await
    }

    /// Looks up the presented session and checks its echo attribute.
    fn resolve_session(&self, request: &Request) -> Option<SessionHandle> {
        let presented = request.session_id.as_deref()?;
        let session = self.store.get_str(presented)?;
        if session.session_id_echo().as_deref() == Some(presented) {
            Some(session)
        } else {
            tracing::debug!(session_id = presented, "session echo mismatch");
            None
        }
    }

    async fn finish<S: ResponseSink>(
        &self,
        request: &Request,
        response: &Response,
        sink: &mut S,
        outcome: DispatchOutcome,
    ) -> DispatchOutcome {
        match respond(&self.codec, response, sink).await {
            Ok(()) => outcome,
            Err(e) => {
                self.abort(Some(request), &e);
                DispatchOutcome::DeliveryFailed
            }
        }
    }

    fn abort(&self, request: Option<&Request>, error: &GatewayError) {
        tracing::warn!(error = %error, "operation pipeline aborted");
        if self.config.error_logging {
            self.handler.log_exception(request, error);
        }
    }
}
