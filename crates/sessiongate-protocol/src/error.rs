//! Error types for the protocol layer.
//!
//! Everything here means "the envelope could not be read or written".
//! Session and permission problems are not errors at this layer; they
//! travel inside a well-formed [`Response`](crate::Response).

/// Errors that can occur while decoding requests or encoding responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a response into text).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed (turning text into an envelope).
    ///
    /// Common causes: malformed JSON, missing `id`/`method`, wrong
    /// field types, or a truncated body.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The raw request bytes are not valid in the expected character set.
    #[error("invalid character encoding: {0}")]
    InvalidEncoding(#[source] std::str::Utf8Error),

    /// The envelope parsed but breaks a protocol rule,
    /// e.g. a blank method name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A binary response was handed to the text encoder. Binary bodies
    /// are delivered as attachments, never inline.
    #[error("binary response body cannot be encoded as text")]
    BinaryBody,
}
