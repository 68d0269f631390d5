//! Integration tests for delivering responses through a tokio stream.

use sessiongate_transport::{ATTACHMENT_CONTENT_TYPE, Delivery, StreamSink, TransportError, deliver};
use tokio::io::AsyncReadExt;

// =========================================================================
// Helpers
// =========================================================================

/// Delivers into one end of an in-memory pipe and returns what the other
/// end read until EOF.
async fn deliver_over_pipe(delivery: Delivery) -> (StreamSink<tokio::io::DuplexStream>, Vec<u8>) {
    let (client, mut server) = tokio::io::duplex(64);
    let reader = tokio::spawn(async move {
        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        received
    });

    let mut sink = StreamSink::new(client);
    deliver(&mut sink, delivery).await.unwrap();
    let received = reader.await.unwrap();
    (sink, received)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_deliver_text_over_stream_reader_sees_body_then_eof() {
    let body = "x".repeat(500);
    let (sink, received) = deliver_over_pipe(Delivery::Text {
        content_type: "application/json; charset=utf-8".into(),
        body: body.clone(),
    })
    .await;

    assert_eq!(received, body.into_bytes());
    assert_eq!(sink.content_type(), Some("application/json; charset=utf-8"));
    assert_eq!(sink.content_length(), Some(500));
}

#[tokio::test]
async fn test_deliver_attachment_over_stream_records_headers() {
    let (sink, received) = deliver_over_pipe(Delivery::Attachment {
        filename: "dump.bin".into(),
        bytes: vec![0, 159, 146, 150],
    })
    .await;

    assert_eq!(received, vec![0, 159, 146, 150]);
    assert_eq!(sink.content_type(), Some(ATTACHMENT_CONTENT_TYPE));
    assert_eq!(
        sink.headers(),
        &[(
            "Content-Disposition".to_string(),
            "attachment; filename=\"dump.bin\"".to_string()
        )]
    );
}

#[tokio::test]
async fn test_deliver_twice_on_stream_returns_already_delivered() {
    let (client, _server) = tokio::io::duplex(64);
    let mut sink = StreamSink::new(client);
    let text = || Delivery::Text {
        content_type: "text/plain".into(),
        body: "once".into(),
    };

    deliver(&mut sink, text()).await.unwrap();
    let second = deliver(&mut sink, text()).await;

    assert!(matches!(second, Err(TransportError::AlreadyDelivered)));
}
