//! Server-Sent Events transport for outbound chat events.
//!
//! Each [`OutboundEvent`] becomes exactly one SSE frame, written in order
//! and flushed as it is produced:
//!
//! ```text
//! event: message
//! data: Hel
//!
//! ```

use super::disconnect::DisconnectStream;
use crate::api::models::Provider;
use crate::core::metrics::get_metrics;
use crate::services::{ChatEventStream, OutboundEvent};
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Format an SSE event for transmission.
///
/// Every line of `data` gets its own `data:` field so embedded line breaks
/// never terminate the event early; a receiver joins them back with `\n`.
pub fn format_sse_event(event: &str, data: &str) -> String {
    let mut output = String::with_capacity(event.len() + data.len() + 16);
    output.push_str("event: ");
    output.push_str(event);
    output.push('\n');

    let normalized = data.replace("\r\n", "\n").replace('\r', "\n");
    for line in normalized.split('\n') {
        output.push_str("data: ");
        output.push_str(line);
        output.push('\n');
    }

    output.push('\n');
    output
}

/// Encode one outbound event as an SSE frame.
pub fn encode_event(event: &OutboundEvent) -> Bytes {
    Bytes::from(format_sse_event(event.kind(), event.data()))
}

/// Build the streaming HTTP response for a dispatched chat request.
///
/// The body ends when `events` ends. If the caller disconnects first, the
/// body is dropped and with it the upstream session behind `events`.
pub fn sse_response(events: ChatEventStream, provider: Provider, request_id: String) -> Response {
    let frames = events.map(move |event| {
        get_metrics()
            .stream_events
            .with_label_values(&[provider.as_str(), event.kind()])
            .inc();
        Ok::<Bytes, Infallible>(encode_event(&event))
    });

    let body = Body::from_stream(DisconnectStream::new(frames, provider, request_id));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::sse::SseParser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_sse_event() {
        assert_eq!(
            format_sse_event("message", "Hel"),
            "event: message\ndata: Hel\n\n"
        );
    }

    #[test]
    fn test_format_sse_event_multiline() {
        assert_eq!(
            format_sse_event("message", "a\nb\r\nc\n"),
            "event: message\ndata: a\ndata: b\ndata: c\ndata: \n\n"
        );
    }

    #[test]
    fn test_format_then_parse_preserves_payload() {
        let payload = "line one\n\nline three";
        let mut parser = SseParser::new();
        let events = parser.parse(format_sse_event("error", payload).as_bytes());
        assert_eq!(events[0].event.as_deref(), Some("error"));
        assert_eq!(events[0].data.as_deref(), Some(payload));
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(
            encode_event(&OutboundEvent::Message("Hel".into())),
            Bytes::from_static(b"event: message\ndata: Hel\n\n")
        );
        assert_eq!(
            encode_event(&OutboundEvent::Error("boom".into())),
            Bytes::from_static(b"event: error\ndata: boom\n\n")
        );
    }

    #[test]
    fn test_encode_multiline_fragment() {
        assert_eq!(
            encode_event(&OutboundEvent::Message("a\nb".into())),
            Bytes::from_static(b"event: message\ndata: a\ndata: b\n\n")
        );
    }

    #[tokio::test]
    async fn test_sse_response_headers_and_body() {
        let events = futures::stream::iter(vec![
            OutboundEvent::Message("Hel".into()),
            OutboundEvent::Message("lo!".into()),
        ])
        .boxed();

        let response = sse_response(events, Provider::Gemini, "req-1".into());
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            body,
            Bytes::from_static(b"event: message\ndata: Hel\n\nevent: message\ndata: lo!\n\n")
        );
    }
}
