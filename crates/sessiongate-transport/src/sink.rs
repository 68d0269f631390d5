//! Ready-made [`ResponseSink`] implementations.

use std::collections::HashMap;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{ResponseSink, TransportError};

/// A sink that keeps everything in memory.
///
/// Useful for embedding the dispatchers behind a listener that wants the
/// finished response as a value, and for tests. `body()` stays `None`
/// until something was delivered, which is how callers tell "no response"
/// apart from "empty response".
#[derive(Debug, Default, Clone)]
pub struct BufferedResponse {
    content_type: Option<String>,
    content_length: Option<usize>,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl BufferedResponse {
    /// Creates an empty, undelivered response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The content type, if one was set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The announced content length, if one was set.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Looks up a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The delivered body, or `None` if nothing was written.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The delivered body as UTF-8 text.
    pub fn body_text(&self) -> Option<&str> {
        self.body().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns `true` once a body has been written.
    pub fn is_delivered(&self) -> bool {
        self.body.is_some()
    }
}

impl ResponseSink for BufferedResponse {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    fn set_content_length(&mut self, len: usize) {
        self.content_length = Some(len);
    }

    async fn write_body(&mut self, body: &[u8]) -> Result<(), TransportError> {
        if self.body.is_some() {
            return Err(TransportError::AlreadyDelivered);
        }
        self.body = Some(body.to_vec());
        Ok(())
    }
}

/// A sink that streams the body into any tokio writer.
///
/// Metadata is recorded for the listener to turn into headers; only the
/// body bytes reach the writer. The writer is flushed and shut down after
/// the body, so one `StreamSink` serves exactly one response.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
    content_type: Option<String>,
    content_length: Option<usize>,
    headers: Vec<(String, String)>,
    closed: bool,
}

impl<W> StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            content_type: None,
            content_length: None,
            headers: Vec::new(),
            closed: false,
        }
    }

    /// The content type, if one was set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The announced content length, if one was set.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Headers in the order they were set.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Gives the writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> ResponseSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| n != name);
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn set_content_length(&mut self, len: usize) {
        self.content_length = Some(len);
    }

    async fn write_body(&mut self, body: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::AlreadyDelivered);
        }
        self.closed = true;
        self.writer
            .write_all(body)
            .await
            .map_err(TransportError::WriteFailed)?;
        self.writer
            .shutdown()
            .await
            .map_err(TransportError::WriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffered_response_rejects_second_write() {
        let mut sink = BufferedResponse::new();
        assert!(!sink.is_delivered());

        sink.write_body(b"first").await.unwrap();
        let second = sink.write_body(b"second").await;

        assert!(matches!(second, Err(TransportError::AlreadyDelivered)));
        assert_eq!(sink.body_text(), Some("first"));
    }

    #[tokio::test]
    async fn test_stream_sink_writes_body_to_writer() {
        let mut sink = StreamSink::new(Vec::<u8>::new());
        sink.set_content_type("application/json");
        sink.set_header("X-Test", "1");
        sink.set_header("X-Test", "2");

        sink.write_body(b"payload").await.unwrap();

        assert_eq!(sink.content_type(), Some("application/json"));
        assert_eq!(sink.headers(), &[("X-Test".to_string(), "2".to_string())]);
        assert_eq!(sink.into_inner(), b"payload".to_vec());
    }

    #[tokio::test]
    async fn test_stream_sink_reports_write_failure() {
        // A duplex whose read half is dropped refuses writes.
        let (client, server) = tokio::io::duplex(8);
        drop(server);
        let mut sink = StreamSink::new(client);

        let result = sink.write_body(b"lost").await;

        assert!(matches!(result, Err(TransportError::WriteFailed(_))));
    }
}
