//! Transport boundary for Sessiongate.
//!
//! The HTTP listener itself lives outside this workspace. What the
//! dispatchers need from it is small, and this crate pins it down:
//!
//! - **Inbound**: [`RequestParams`], the raw parameter bytes of one call.
//!   The envelope travels under [`PARAMETER_NAME`].
//! - **Outbound**: a [`ResponseSink`] that accepts response metadata and
//!   body bytes, plus [`deliver`], the single write path that turns a
//!   [`Delivery`] into sink calls.
//!
//! ```text
//! Listener (external) → RequestParams → dispatcher → Delivery → deliver() → ResponseSink
//! ```

mod error;
mod sink;

pub use error::TransportError;
pub use sink::{BufferedResponse, StreamSink};

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the parameter that carries the request envelope.
pub const PARAMETER_NAME: &str = "request";

/// Content type used for attachment (binary) deliveries.
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/x-download";

/// Counter for generating call identifiers.
static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one incoming call, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(u64);

impl CallId {
    /// Allocates the next process-wide call id.
    pub fn next() -> Self {
        Self(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The raw parameters of one call, as handed over by the listener.
///
/// Values are kept as bytes: turning them into text depends on the
/// dispatcher's character-encoding setting, not on the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    values: HashMap<String, Vec<u8>>,
}

impl RequestParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parameter set carrying only the request envelope.
    pub fn with_request(raw: impl Into<Vec<u8>>) -> Self {
        let mut params = Self::new();
        params.insert(PARAMETER_NAME, raw);
        params
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.values.insert(name.into(), value.into());
    }

    /// Returns the raw bytes of a parameter.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Returns the raw envelope bytes.
    ///
    /// # Errors
    /// [`TransportError::MissingParameter`] if the call carried no
    /// [`PARAMETER_NAME`] parameter.
    pub fn request(&self) -> Result<&[u8], TransportError> {
        self.get(PARAMETER_NAME)
            .ok_or_else(|| TransportError::MissingParameter(PARAMETER_NAME.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// What gets written back for one call.
///
/// A response is either inline text (the encoded envelope) or a named
/// byte blob delivered as a file download. The write path switches on
/// this tag instead of inspecting flags on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// An encoded envelope, written inline.
    Text {
        /// MIME type reported by the codec that produced `body`.
        content_type: String,
        /// The encoded envelope.
        body: String,
    },

    /// A file attachment.
    Attachment {
        /// File name announced in the `Content-Disposition` header.
        filename: String,
        /// Raw file content.
        bytes: Vec<u8>,
    },
}

impl Delivery {
    /// Number of body bytes this delivery writes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text { body, .. } => body.len(),
            Self::Attachment { bytes, .. } => bytes.len(),
        }
    }

    /// Returns `true` if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for attachment deliveries.
    pub fn is_attachment(&self) -> bool {
        matches!(self, Self::Attachment { .. })
    }
}

/// Destination for one call's response, supplied by the listener.
///
/// Metadata setters are synchronous; writing the body may block on the
/// network and is async.
pub trait ResponseSink: Send {
    /// Sets the response content type.
    fn set_content_type(&mut self, content_type: &str);

    /// Sets a response header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: &str);

    /// Announces the body length in bytes.
    fn set_content_length(&mut self, len: usize);

    /// Writes the complete body and closes the response.
    fn write_body(
        &mut self,
        body: &[u8],
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// Writes a [`Delivery`] to a sink.
///
/// Text deliveries carry their codec's content type. Attachments are sent
/// as [`ATTACHMENT_CONTENT_TYPE`] with a `Content-Disposition` header
/// naming the file and an explicit content length.
///
/// # Errors
/// [`TransportError::InvalidFilename`] if an attachment name contains
/// control characters; nothing is written to the sink in that case.
/// Otherwise whatever the sink reports while writing the body.
pub async fn deliver<S: ResponseSink>(sink: &mut S, delivery: Delivery) -> Result<(), TransportError> {
    match delivery {
        Delivery::Text { content_type, body } => {
            sink.set_content_type(&content_type);
            sink.set_content_length(body.len());
            sink.write_body(body.as_bytes()).await
        }
        Delivery::Attachment { filename, bytes } => {
            let disposition = content_disposition(&filename)?;
            sink.set_content_type(ATTACHMENT_CONTENT_TYPE);
            sink.set_header("Content-Disposition", &disposition);
            sink.set_content_length(bytes.len());
            tracing::debug!(%filename, len = bytes.len(), "writing attachment");
            sink.write_body(&bytes).await
        }
    }
}

/// Builds an `attachment` disposition with the name as a quoted string.
fn content_disposition(filename: &str) -> Result<String, TransportError> {
    if filename.chars().any(char::is_control) {
        return Err(TransportError::InvalidFilename(filename.to_string()));
    }
    let mut value = String::with_capacity(filename.len() + 24);
    value.push_str("attachment; filename=\"");
    for c in filename.chars() {
        if matches!(c, '"' | '\\') {
            value.push('\\');
        }
        value.push(c);
    }
    value.push('"');
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_id_display() {
        let id = CallId(7);
        assert_eq!(id.to_string(), "call-7");
    }

    #[test]
    fn test_call_id_next_is_unique() {
        let a = CallId::next();
        let b = CallId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_request_params_with_request_sets_envelope() {
        let params = RequestParams::with_request("{}");
        assert_eq!(params.request().unwrap(), b"{}");
    }

    #[test]
    fn test_request_params_missing_envelope_returns_error() {
        let mut params = RequestParams::new();
        params.insert("other", "x");

        let result = params.request();

        assert!(
            matches!(result, Err(TransportError::MissingParameter(ref name)) if name == PARAMETER_NAME)
        );
    }

    #[test]
    fn test_delivery_len_counts_body_bytes() {
        let text = Delivery::Text {
            content_type: "application/json".into(),
            body: "héllo".into(),
        };
        assert_eq!(text.len(), 6);
        assert!(!text.is_attachment());

        let file = Delivery::Attachment {
            filename: "a.bin".into(),
            bytes: vec![],
        };
        assert!(file.is_empty());
        assert!(file.is_attachment());
    }

    #[tokio::test]
    async fn test_deliver_text_sets_content_type_and_length() {
        let mut sink = BufferedResponse::new();
        let delivery = Delivery::Text {
            content_type: "application/json".into(),
            body: "{\"a\":1}".into(),
        };

        deliver(&mut sink, delivery).await.unwrap();

        assert_eq!(sink.content_type(), Some("application/json"));
        assert_eq!(sink.content_length(), Some(7));
        assert_eq!(sink.body_text().unwrap(), "{\"a\":1}");
        assert!(sink.header("Content-Disposition").is_none());
    }

    #[tokio::test]
    async fn test_deliver_attachment_sets_disposition_header() {
        let mut sink = BufferedResponse::new();
        let delivery = Delivery::Attachment {
            filename: "report.fasta".into(),
            bytes: vec![1, 2, 3, 4],
        };

        deliver(&mut sink, delivery).await.unwrap();

        assert_eq!(sink.content_type(), Some(ATTACHMENT_CONTENT_TYPE));
        assert_eq!(
            sink.header("Content-Disposition"),
            Some("attachment; filename=\"report.fasta\"")
        );
        assert_eq!(sink.content_length(), Some(4));
        assert_eq!(sink.body(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_content_disposition_escapes_quotes_and_semicolons() {
        let value = content_disposition(r#"a";b\c.txt"#).unwrap();
        assert_eq!(value, r#"attachment; filename="a\";b\\c.txt""#);
    }

    #[tokio::test]
    async fn test_deliver_attachment_with_line_break_is_refused() {
        let mut sink = BufferedResponse::new();
        let delivery = Delivery::Attachment {
            filename: "x.txt\r\nSet-Cookie: a=b".into(),
            bytes: vec![1],
        };

        let result = deliver(&mut sink, delivery).await;

        assert!(matches!(result, Err(TransportError::InvalidFilename(_))));
        assert!(sink.header("Content-Disposition").is_none());
        assert!(!sink.is_delivered());
    }
}
