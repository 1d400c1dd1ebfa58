//! Server-sent event parsing for streamed Messages API responses.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::types::{
    SseContentBlockDelta, SseContentBlockStart, SseContentBlockStop, SseError, SseMessageDelta,
    SseMessageStart,
};

#[derive(Debug, Clone)]
pub enum StreamEvent {
    MessageStart(SseMessageStart),
    ContentBlockStart(SseContentBlockStart),
    ContentBlockDelta(SseContentBlockDelta),
    ContentBlockStop(SseContentBlockStop),
    MessageDelta(SseMessageDelta),
    MessageStop,
    Ping,
    Error(SseError),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

fn decode<T: DeserializeOwned>(name: &str, data: &str) -> Result<T, LlmError> {
    serde_json::from_str(data)
        .map_err(|source| LlmError::JsonParse { context: format!("{name} event"), source })
}

/// Map one named SSE event to a [`StreamEvent`]. Unknown names yield `None`.
pub(crate) fn parse_event(name: &str, data: &str) -> Option<Result<StreamEvent, LlmError>> {
    let parsed = match name {
        "message_start" => decode(name, data).map(StreamEvent::MessageStart),
        "content_block_start" => decode(name, data).map(StreamEvent::ContentBlockStart),
        "content_block_delta" => decode(name, data).map(StreamEvent::ContentBlockDelta),
        "content_block_stop" => decode(name, data).map(StreamEvent::ContentBlockStop),
        "message_delta" => decode(name, data).map(StreamEvent::MessageDelta),
        "message_stop" => Ok(StreamEvent::MessageStop),
        "ping" => Ok(StreamEvent::Ping),
        "error" => decode(name, data).map(StreamEvent::Error),
        _ => return None,
    };
    Some(parsed)
}

/// Turn a successful streaming response into typed events.
pub fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let events = response.bytes_stream().eventsource().filter_map(|result| async move {
        match result {
            Ok(event) => parse_event(&event.event, &event.data),
            Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
        }
    });
    Box::pin(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SseDelta;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_response(body: &str) -> reqwest::Response {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_owned()),
            )
            .mount(&server)
            .await;
        reqwest::get(server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_deltas_and_skips_unknown_events() {
        let body = concat!(
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            "event: brand_new_event\ndata: {}\n\n",
            "event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: content_block_delta\ndata: {\"index\":1,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"tr\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        let events: Vec<_> = parse_sse_stream(sse_response(body).await).collect().await;
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], Ok(StreamEvent::Ping)));
        match &events[1] {
            Ok(StreamEvent::ContentBlockDelta(d)) => {
                assert_eq!(d.delta, SseDelta::TextDelta { text: "Hi".into() });
            },
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[2] {
            Ok(StreamEvent::ContentBlockDelta(d)) => {
                assert_eq!(d.index, 1);
                assert_eq!(d.delta, SseDelta::InputJsonDelta { partial_json: "{\"tr".into() });
            },
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[3], Ok(StreamEvent::MessageStop)));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let parsed = parse_event("message_delta", "{not json").unwrap();
        assert!(matches!(parsed, Err(LlmError::JsonParse { .. })));
        assert!(parse_event("something_else", "{}").is_none());
    }

    #[test]
    fn error_event_carries_detail() {
        let parsed = parse_event(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap()
        .unwrap();
        match parsed {
            StreamEvent::Error(e) => assert_eq!(e.error.error_type, "overloaded_error"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
