//! Codec trait and the envelope encoding contract.
//!
//! A [`Codec`] turns typed values into text and back. On top of it sit the
//! envelope-level operations the dispatchers use:
//!
//! - [`decode_text`]: raw parameter bytes → text, honouring the
//!   dispatcher's character-encoding setting.
//! - [`decode_request`]: text → [`Request`]; malformed input is a hard
//!   failure, never a partial request.
//! - [`render`]: [`Response`] → [`Delivery`]: inline text for structured
//!   bodies, an attachment for binary ones.

use serde::{de::DeserializeOwned, Serialize};
use sessiongate_transport::Delivery;

use crate::types::WireResponse;
use crate::{ProtocolError, Request, Response, ResponseBody};

/// A text codec for envelopes.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every call a dispatcher handles, across tokio worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into text.
    ///
    /// # Errors
    /// `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes text back into a value.
    ///
    /// # Errors
    /// `ProtocolError::Decode` if the text is malformed or doesn't match
    /// the expected shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;

    /// MIME type of the text this codec produces.
    fn content_type(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// ```rust
/// use sessiongate_protocol::{decode_request, JsonCodec};
///
/// let req = decode_request(&JsonCodec, r#"{"id":"7","method":"ping"}"#).unwrap();
/// assert_eq!(req.method, "ping");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    fn content_type(&self) -> &'static str {
        "application/json; charset=utf-8"
    }
}

// ---------------------------------------------------------------------------
// Envelope operations
// ---------------------------------------------------------------------------

/// Turns raw parameter bytes into text.
///
/// With `utf8` set the bytes must be valid UTF-8. Otherwise they are read
/// as ISO-8859-1, where every byte maps to the code point of equal value,
/// so this branch cannot fail.
///
/// # Errors
/// `ProtocolError::InvalidEncoding` for invalid UTF-8 when `utf8` is set.
pub fn decode_text(raw: &[u8], utf8: bool) -> Result<String, ProtocolError> {
    if utf8 {
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(ProtocolError::InvalidEncoding)
    } else {
        Ok(raw.iter().map(|&b| char::from(b)).collect())
    }
}

/// Decodes a request envelope.
///
/// # Errors
/// - `ProtocolError::Decode` for text that isn't a request envelope.
/// - `ProtocolError::InvalidMessage` for a blank method name.
pub fn decode_request<C: Codec>(codec: &C, text: &str) -> Result<Request, ProtocolError> {
    let request: Request = codec.decode(text)?;
    if request.method.trim().is_empty() {
        return Err(ProtocolError::InvalidMessage("method must not be blank".into()));
    }
    Ok(request)
}

/// Encodes a structured response as text.
///
/// # Errors
/// `ProtocolError::BinaryBody` for binary responses, which never travel
/// inline; `ProtocolError::Encode` if serialization fails.
pub fn encode_response<C: Codec>(codec: &C, response: &Response) -> Result<String, ProtocolError> {
    let wire = response.to_wire().ok_or(ProtocolError::BinaryBody)?;
    codec.encode(&wire)
}

/// Decodes a response envelope (the caller's side of the exchange).
///
/// # Errors
/// `ProtocolError::Decode` for text that isn't a response envelope.
pub fn decode_response<C: Codec>(codec: &C, text: &str) -> Result<Response, ProtocolError> {
    let wire: WireResponse = codec.decode(text)?;
    Ok(wire.into())
}

/// Turns a finished response into what the transport writes.
///
/// # Errors
/// `ProtocolError::Encode` if a structured response fails to serialize.
pub fn render<C: Codec>(codec: &C, response: &Response) -> Result<Delivery, ProtocolError> {
    match response.body() {
        ResponseBody::Binary(file) => Ok(Delivery::Attachment {
            filename: file.name.clone(),
            bytes: file.bytes.clone(),
        }),
        ResponseBody::Structured(_) => Ok(Delivery::Text {
            content_type: codec.content_type().to_string(),
            body: encode_response(codec, response)?,
        }),
    }
}
