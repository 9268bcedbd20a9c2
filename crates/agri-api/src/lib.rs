//! agri-api: HTTP API for Agri Agent
//!
//! Exposes the streaming advisor endpoint and session management over HTTP.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{build_router, start_server, AppState};
