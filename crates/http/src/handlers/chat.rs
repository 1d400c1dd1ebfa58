use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use treewright_core::EVENT_CHANNEL_CAPACITY;
use treewright_llm::AgentEvent;

use crate::AppState;
use crate::api_error::ApiError;

/// Stream one chat turn as SSE, one JSON-encoded agent event per message.
///
/// Request errors are returned as JSON before the stream opens; failures
/// during the run arrive as an `error` event.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
    let session = state.chat.start(&body).await?;

    let (tx, mut rx) = mpsc::channel::<AgentEvent>(EVENT_CHANNEL_CAPACITY);
    let chat = Arc::clone(&state.chat);
    tokio::spawn(async move {
        if let Err(e) = chat.stream(session, tx).await {
            tracing::warn!(error = %e, "chat stream ended with error");
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match Event::default().json_data(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => tracing::warn!(error = %e, "failed to encode agent event"),
            }
        }
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
