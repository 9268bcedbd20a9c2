//! エラー型定義 (agri-api)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// agri-api のエラー型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Core error: {0}")]
    Core(agri_core::Error),
}

impl From<agri_core::Error> for ApiError {
    fn from(e: agri_core::Error) -> Self {
        match e {
            agri_core::Error::InvalidRequest(message) => Self::InvalidRequest(message),
            other => Self::Core(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, ApiError>;
