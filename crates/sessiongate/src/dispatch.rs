//! Pieces shared by both dispatchers: the outcome type and the decode and
//! respond stages.

use sessiongate_protocol::{Codec, Request, Response, Status, decode_request, decode_text, render};
use sessiongate_transport::{RequestParams, ResponseSink, deliver};

use crate::GatewayError;

/// How a dispatcher call ended.
///
/// The caller only ever sees what was written to the sink; the outcome is
/// for the embedder (metrics, access logs, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and its response was delivered with this status.
    Completed(Status),
    /// No usable session; a NO_SESSION response was delivered.
    NoSession,
    /// The permission check failed; an ERROR response was delivered.
    Denied,
    /// Credentials were refused; an ERROR response was delivered.
    AuthFailed,
    /// The request could not be read. Nothing was written.
    DecodeFailed,
    /// A handler callback failed. Nothing was written.
    HandlerFailed,
    /// Rendering or writing the response failed.
    DeliveryFailed,
}

impl DispatchOutcome {
    /// Returns `true` if a response reached the sink.
    pub fn responded(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::NoSession | Self::Denied | Self::AuthFailed
        )
    }
}

/// DECODING: parameter → text → envelope.
pub(crate) fn decode_call<C: Codec>(
    codec: &C,
    params: &RequestParams,
    utf8: bool,
) -> Result<Request, GatewayError> {
    let raw = params.request()?;
    let text = decode_text(raw, utf8)?;
    Ok(decode_request(codec, &text)?)
}

/// RESPONDING: render the finished response and hand it to the sink.
pub(crate) async fn respond<C: Codec, S: ResponseSink>(
    codec: &C,
    response: &Response,
    sink: &mut S,
) -> Result<(), GatewayError> {
    let delivery = render(codec, response)?;
    deliver(sink, delivery).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessiongate_protocol::{JsonCodec, ProtocolError};
    use sessiongate_transport::{BufferedResponse, TransportError};

    #[test]
    fn test_decode_call_missing_parameter_is_transport_error() {
        let result = decode_call(&JsonCodec, &RequestParams::new(), false);
        assert!(matches!(
            result,
            Err(GatewayError::Transport(TransportError::MissingParameter(_)))
        ));
    }

    #[test]
    fn test_decode_call_bad_envelope_is_protocol_error() {
        let params = RequestParams::with_request("{\"id\":");
        let result = decode_call(&JsonCodec, &params, true);
        assert!(matches!(result, Err(GatewayError::Protocol(ProtocolError::Decode(_)))));
    }

    #[test]
    fn test_decode_call_latin1_parameter_decodes() {
        // "método" with 'é' as the single byte 0xE9.
        let mut raw = br#"{"id":"1","method":"m"#.to_vec();
        raw.push(0xe9);
        raw.extend_from_slice(br#"todo"}"#);

        let request = decode_call(&JsonCodec, &RequestParams::with_request(raw), false).unwrap();

        assert_eq!(request.method, "método");
    }

    #[tokio::test]
    async fn test_respond_writes_rendered_text() {
        let request = Request::new("4", "ping");
        let response = Response::new().answer(&request);
        let mut sink = BufferedResponse::new();

        respond(&JsonCodec, &response, &mut sink).await.unwrap();

        assert_eq!(sink.content_type(), Some(JsonCodec.content_type()));
        assert!(sink.body_text().unwrap().contains("\"ping\""));
    }

    #[test]
    fn test_responded_only_for_written_outcomes() {
        assert!(DispatchOutcome::Completed(Status::Error).responded());
        assert!(DispatchOutcome::NoSession.responded());
        assert!(!DispatchOutcome::DecodeFailed.responded());
        assert!(!DispatchOutcome::HandlerFailed.responded());
        assert!(!DispatchOutcome::DeliveryFailed.responded());
    }
}
