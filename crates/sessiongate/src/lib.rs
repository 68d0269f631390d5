//! # Sessiongate
//!
//! Session-gated request dispatch with background session expiry.
//!
//! A service implements [`LoginHandler`] for its login endpoint and
//! [`OperationHandler`] for everything else. Sessiongate decodes each call,
//! resolves and checks the caller's session, gates the operation on the
//! session's permissions, runs the handler, and writes a structured
//! response. A background sweeper evicts sessions left idle too long.
//!
//! ## Architecture
//!
//! ```text
//! Transport (RequestParams / ResponseSink)
//!     ↕
//! Protocol (Request / Response / Codec)
//!     ↕
//! Dispatchers (LoginDispatcher, AuthDispatcher)  ← this crate
//!     ↕
//! Sessions (SessionStore)  ←──  Sweeper (ExpirySweeper)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessiongate::prelude::*;
//!
//! // Implement LoginHandler and OperationHandler for your service, then:
//! // let gateway = Gateway::builder().build();
//! // let login = gateway.login(MyLogin);
//! // let notes = gateway.operation(MyNotes);
//! //
//! // let mut sink = BufferedResponse::new();
//! // login.dispatch(&RequestParams::with_request(raw), &mut sink).await;
//! ```

mod config;
mod dispatch;
mod error;
mod gateway;
mod handler;
mod login;
mod operation;
pub mod telemetry;

pub use config::{ACCESS_DENIED_MESSAGE, DEFAULT_NOT_CORRECT_MESSAGE, DispatchConfig, LoginConfig};
pub use dispatch::DispatchOutcome;
pub use error::{GatewayError, HandlerError};
pub use gateway::{Gateway, GatewayBuilder, GatewayConfig};
pub use handler::{LoginHandler, OperationHandler};
pub use login::LoginDispatcher;
pub use operation::AuthDispatcher;

pub use sessiongate_protocol as protocol;
pub use sessiongate_session as session;
pub use sessiongate_sweep as sweep;
pub use sessiongate_transport as transport;

/// Everything a service needs to implement handlers and run a gateway.
pub mod prelude {
    pub use crate::{
        ACCESS_DENIED_MESSAGE, AuthDispatcher, DispatchConfig, DispatchOutcome, Gateway, GatewayConfig, GatewayError,
        HandlerError, LoginConfig, LoginDispatcher, LoginHandler, OperationHandler,
    };
    pub use sessiongate_protocol::{BinaryFile, Codec, JsonCodec, Request, Response, Status};
    pub use sessiongate_session::{SessionConfig, SessionHandle, SessionId, SessionStore};
    pub use sessiongate_transport::{BufferedResponse, RequestParams, ResponseSink, StreamSink};
}
