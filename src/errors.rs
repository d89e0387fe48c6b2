use crate::services::{redirect_guard::RedirectError, storage_service::StorageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Failure kinds of the proxy and listing use cases.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("suspicious path detected: {0}")]
    SuspiciousPath(String),
    #[error("object not found")]
    ObjectNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid host in presigned URL: {0}")]
    InvalidHost(String),
    #[error("malformed presigned URL: {0}")]
    MalformedPresignedUrl(url::ParseError),
}

impl From<RedirectError> for GatewayError {
    fn from(err: RedirectError) -> Self {
        match err {
            RedirectError::Malformed(parse) => GatewayError::MalformedPresignedUrl(parse),
            RedirectError::InvalidHost { host, .. } => GatewayError::InvalidHost(host),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::SuspiciousPath(_) => StatusCode::BAD_REQUEST,
            GatewayError::ObjectNotFound => StatusCode::NOT_FOUND,
            GatewayError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidHost(_) => StatusCode::FORBIDDEN,
            GatewayError::MalformedPresignedUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::new(err.status(), err.to_string())
    }
}
