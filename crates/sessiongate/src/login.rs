//! The login dispatcher: authenticates a caller and opens its session.
//!
//! ```text
//! DECODING ──→ AUTHENTICATING ──→ SESSION_CREATE ──→ RESPONDING
//!    │               │                  │
//!    ▼               ▼                  ▼
//! DecodeFailed   AuthFailed        HandlerFailed
//! ```
//!
//! A login that fails after the session was created removes that session
//! again, so callers never find a half-seeded one.

use std::sync::Arc;

use sessiongate_protocol::{Codec, JsonCodec, Request, Response, Status};
use sessiongate_session::{SessionHandle, SessionStore};
use sessiongate_transport::{CallId, RequestParams, ResponseSink};

use crate::dispatch::{DispatchOutcome, decode_call, respond};
use crate::{GatewayError, HandlerError, LoginConfig, LoginHandler};

/// Dispatcher for the login endpoint.
pub struct LoginDispatcher<H, C = JsonCodec> {
    store: Arc<SessionStore>,
    handler: H,
    codec: C,
    config: LoginConfig,
}

impl<H: LoginHandler> LoginDispatcher<H, JsonCodec> {
    /// Creates a dispatcher speaking JSON.
    pub fn new(store: Arc<SessionStore>, handler: H, config: LoginConfig) -> Self {
        Self::with_codec(store, handler, JsonCodec, config)
    }
}

impl<H: LoginHandler, C: Codec> LoginDispatcher<H, C> {
    /// Creates a dispatcher with a custom codec.
    pub fn with_codec(store: Arc<SessionStore>, handler: H, codec: C, config: LoginConfig) -> Self {
        Self {
            store,
            handler,
            codec,
            config,
        }
    }

    /// The dispatcher's configuration.
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Runs one login call and writes the answer to `sink`.
    #[tracing::instrument(name = "login", skip_all, fields(call = %CallId::next()))]
    pub async fn dispatch<S: ResponseSink>(&self, params: &RequestParams, sink: &mut S) -> DispatchOutcome {
        let outcome = self.run(params, sink).await;
        tracing::debug!(?outcome, "login call finished");
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

        // --- AUTHENTICATING ---
        let accepted = match self.handler.authenticate(&request).await {
            Ok(accepted) => accepted,
            Err(e) => {
                self.abort(Some(&request), &GatewayError::from(e));
                return DispatchOutcome::HandlerFailed;
            }
        };

        if !accepted {
            let response = Response::error(self.config.not_correct_message.as_str()).answer(&request);
            if self.config.operation_logging {
                self.handler.log_error_response(&request, &response, None);
            }
            return self
                .finish(&request, &response, sink, DispatchOutcome::AuthFailed)
                .await;
        }

        // --- SESSION_CREATE ---
        let session = self.store.create();
        if let Err(e) = self.open_session(&request, &session) {
            self.store.remove(session.id());
            self.abort(Some(&request), &GatewayError::from(e));
            return DispatchOutcome::HandlerFailed;
        }

        let mut response = Response::new();
        response.set_session_id(session.id().as_str());
        let response = response.answer(&request);

        // --- RESPONDING ---
        if self.config.operation_logging {
            self.handler.log_success(&request, &response, Some(&session));
        }
        let outcome = self
            .finish(&request, &response, sink, DispatchOutcome::Completed(Status::Success))
            .await;
        // The caller never learned the id.
        if outcome == DispatchOutcome::DeliveryFailed {
            self.store.remove(session.id());
        }
        outcome
    }

    /// Seeds the new session, then writes the reserved attributes.
    fn open_session(&self, request: &Request, session: &SessionHandle) -> Result<(), HandlerError> {
        self.handler.seed(request, session)?;
        session.stamp_session_id(session.id().as_str());
        let permissions = self.handler.resolve_permissions(request)?;
        tracing::debug!(session_id = %session.id(), granted = permissions.len(), "session opened");
        session.grant_permissions(permissions);
        Ok(())
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
        tracing::warn!(error = %error, "login pipeline aborted");
        if self.config.error_logging {
            self.handler.log_exception(request, error);
        }
    }
}
