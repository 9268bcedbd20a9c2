//! HTTP API handlers
//!
//! Request handlers for the advisor stream and session management.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use agri_core::{AgriRequest, ChatMessage};

use crate::error::Result;
use crate::server::AppState;

// ============================================================================
// Response types
// ============================================================================

/// Acknowledgement for a cleared session
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub status: &'static str,
}

/// Stored history of a session
#[derive(Debug, Serialize)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    pub message_count: usize,
    pub messages: Vec<ChatMessage>,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Advisor endpoint - stream the model's answer as Server-Sent Events
///
/// Each event is `data: <json>` carrying `{"token"}`, `{"error"}` or, last,
/// `{"done": true}`. An empty question is answered with 400 instead.
pub async fn ask(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AgriRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    debug!("Advisor request for session {}: {:?}", session_id, req);

    let events = state.chat.exchange(&session_id, req)?;
    let stream = ReceiverStream::new(events).map(|event| Event::default().json_data(event));

    Ok(Sse::new(stream))
}

/// Get the stored history of a session
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionHistoryResponse>> {
    let messages = state.chat.history(&session_id).await?;

    Ok(Json(SessionHistoryResponse {
        session_id,
        message_count: messages.len(),
        messages,
    }))
}

/// Clear session
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearResponse>> {
    state.chat.clear_session(&session_id).await?;
    Ok(Json(ClearResponse { status: "cleared" }))
}
