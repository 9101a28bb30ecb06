//! Consultant chat: relays Gemini's streamed reply to the browser over SSE.
//!
//! The socket carries three event types: `message` with a JSON `delta`
//! fragment, `done` when the reply is complete, and `error` if the upstream
//! call fails mid-response. Chat history lives with the client and arrives
//! in full on each request; nothing is persisted here.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::gemini::ChatTurn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatDelta<'a> {
    delta: &'a str,
}

/// POST /api/v1/chat/stream
pub async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }

    let upstream = state.gemini.stream_chat(req.history, req.message);

    let events = async_stream::stream! {
        futures::pin_mut!(upstream);
        loop {
            match upstream.next().await {
                Some(Ok(delta)) => yield Ok(delta_event(&delta)),
                Some(Err(e)) => {
                    warn!("Chat stream failed mid-response: {e}");
                    yield Ok(error_event());
                    break;
                }
                None => {
                    yield Ok(done_event());
                    break;
                }
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn delta_event(delta: &str) -> Event {
    match Event::default().event("message").json_data(ChatDelta { delta }) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to encode chat delta: {e}");
            error_event()
        }
    }
}

fn error_event() -> Event {
    // Upstream details stay in the logs, not the browser.
    Event::default()
        .event("error")
        .data(r#"{"error":"The AI collaborator failed mid-response"}"#)
}

fn done_event() -> Event {
    Event::default().event("done").data("{}")
}
