//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{ask, clear_session, health, session_history};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Advisor stream + session inspection
        .route("/api/agri/{session_id}", post(ask).get(session_history))
        // Session management
        .route("/api/agri/{session_id}/clear", post(clear_session))
}
