//! Error types for agri-core

use thiserror::Error;

/// Main error type for agri-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected before any state change (surfaced to HTTP callers as 400)
    #[error("{0}")]
    InvalidRequest(String),
}

/// Result type alias for agri-core
pub type Result<T> = std::result::Result<T, Error>;
