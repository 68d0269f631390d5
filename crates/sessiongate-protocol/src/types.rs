//! Envelope types: what a caller sends and what it gets back.
//!
//! A call carries one [`Request`]. The pipeline answers with exactly one
//! [`Response`], or with nothing at all when the call aborts before the
//! responding stage.
//!
//! ```text
//! Request  { id, method, session_id?, payload }
//!    │
//!    ▼  handler + dispatcher
//! Response { status, id, method, session_id?, error?, request_source?, body }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decoded request envelope.
///
/// Decoded once per call and never modified afterwards; every stage of
/// the pipeline borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Caller-supplied correlation token, echoed back in the response.
    #[serde(default)]
    pub id: String,

    /// Operation name, echoed back in the response.
    pub method: String,

    /// The session this call claims. Absent on login calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Operation-specific body. Only the handler interprets it.
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    /// Creates a request without a session.
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            session_id: None,
            payload: Value::Null,
        }
    }

    /// Sets the claimed session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Looks up a top-level payload field.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Looks up a top-level payload field holding a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    /// Produces the redacted copy embedded in error responses.
    ///
    /// Neither the session id nor any payload value is carried over; only
    /// the names of the top-level payload fields survive.
    pub fn detach(&self) -> DetachedRequest {
        let fields = match &self.payload {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        DetachedRequest {
            id: self.id.clone(),
            method: self.method.clone(),
            fields,
        }
    }
}

/// What an ERROR response tells the caller about the rejected request.
///
/// Payload values never appear here. Logins carry passwords and other
/// operations carry identifiers a reader could replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedRequest {
    /// Correlation token of the original request.
    #[serde(default)]
    pub id: String,
    /// Method of the original request.
    #[serde(default)]
    pub method: String,
    /// Top-level payload field names of the original request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The outcome a caller branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The operation ran and succeeded.
    #[default]
    Success,
    /// The operation was refused or failed in a way the handler reported.
    Error,
    /// The call needs a valid session and did not have one.
    NoSession,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::NoSession => write!(f, "no_session"),
        }
    }
}

// ---------------------------------------------------------------------------
// Response body
// ---------------------------------------------------------------------------

/// A named byte blob delivered as a file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    /// File name announced to the caller.
    pub name: String,
    /// File content.
    pub bytes: Vec<u8>,
}

/// The body of a response: inline structured data, or a file.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A JSON tree encoded inline with the envelope fields.
    Structured(Value),
    /// A file, delivered as an attachment instead of an envelope.
    Binary(BinaryFile),
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Structured(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response envelope.
///
/// Handlers build one with the constructors below; the dispatcher then
/// calls [`Response::answer`] (or builds a rejection with
/// [`Response::reject`]), which copies `id`/`method` from the request and
/// settles the status. Fields are private so the status can only be
/// settled through those paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    status: Status,
    id: String,
    method: String,
    session_id: Option<String>,
    error: Option<String>,
    request_source: Option<DetachedRequest>,
    body: ResponseBody,
}

impl Response {
    /// An empty successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// A successful response carrying `payload`.
    pub fn success(payload: Value) -> Self {
        Self {
            body: ResponseBody::Structured(payload),
            ..Self::default()
        }
    }

    /// An ERROR response with a message for the caller.
    pub fn error(message: impl Into<String>) -> Self {
        let mut response = Self::default();
        response.set_error(message);
        response
    }

    /// A successful response delivering a file.
    pub fn binary(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            body: ResponseBody::Binary(BinaryFile {
                name: name.into(),
                bytes: bytes.into(),
            }),
            ..Self::default()
        }
    }

    /// Builds the response for a call the pipeline refused before any
    /// handler ran: `id`/`method` echoed, status and message as given.
    pub fn reject(request: &Request, status: Status, error: Option<String>) -> Self {
        Self {
            status,
            id: request.id.clone(),
            method: request.method.clone(),
            error,
            ..Self::default()
        }
    }

    /// Marks the response as an ERROR with the given message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Status::Error;
        self.error = Some(message.into());
    }

    /// Replaces the structured payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.body = ResponseBody::Structured(payload);
        self
    }

    /// Sets the session id handed to the caller (login only).
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Settles a handler-built response against its request.
    ///
    /// `id` and `method` are copied from the request. An ERROR response
    /// keeps its status and gets the detached request attached; any other
    /// status becomes SUCCESS.
    pub fn answer(mut self, request: &Request) -> Self {
        self.id = request.id.clone();
        self.method = request.method.clone();
        if self.status == Status::Error {
            self.request_source = Some(request.detach());
        } else {
            self.status = Status::Success;
            self.error = None;
        }
        self
    }

    /// Final status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Correlation token echoed from the request.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Method echoed from the request.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Session id assigned by a login, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Error message, present on ERROR responses.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The redacted request attached to ERROR responses.
    pub fn request_source(&self) -> Option<&DetachedRequest> {
        self.request_source.as_ref()
    }

    /// The body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The structured payload, or `None` for binary responses.
    pub fn payload(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Structured(value) => Some(value),
            ResponseBody::Binary(_) => None,
        }
    }

    /// Whether this response is delivered as a file.
    pub fn is_binary(&self) -> bool {
        matches!(self.body, ResponseBody::Binary(_))
    }

    /// Borrowed wire view, or `None` for binary responses.
    pub(crate) fn to_wire(&self) -> Option<WireResponseRef<'_>> {
        let payload = match &self.body {
            ResponseBody::Structured(Value::Null) => None,
            ResponseBody::Structured(value) => Some(value),
            ResponseBody::Binary(_) => return None,
        };
        Some(WireResponseRef {
            status: self.status,
            id: &self.id,
            method: &self.method,
            session_id: self.session_id.as_deref(),
            error: self.error.as_deref(),
            request_source: self.request_source.as_ref(),
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire forms
// ---------------------------------------------------------------------------

/// Text shape of a response, borrowed for encoding.
#[derive(Serialize)]
pub(crate) struct WireResponseRef<'a> {
    status: Status,
    id: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_source: Option<&'a DetachedRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

/// Text shape of a response, owned for decoding.
#[derive(Deserialize)]
pub(crate) struct WireResponse {
    status: Status,
    #[serde(default)]
    id: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    request_source: Option<DetachedRequest>,
    #[serde(default)]
    payload: Value,
}

impl From<WireResponse> for Response {
    fn from(wire: WireResponse) -> Self {
        Self {
            status: wire.status,
            id: wire.id,
            method: wire.method,
            session_id: wire.session_id,
            error: wire.error,
            request_source: wire.request_source,
            body: ResponseBody::Structured(wire.payload),
        }
    }
}
