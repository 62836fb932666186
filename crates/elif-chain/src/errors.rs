//! Chain error types
//!
//! The chain itself never fails: handler panics pass through untouched and a
//! malformed continuation flag simply stops the traversal. These errors cover
//! the host integration and the fallible response writer helpers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors raised around chain dispatch
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Failed to read request body: {message}")]
    BodyRead { message: String },

    #[error("Request body exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Invalid header: {message}")]
    InvalidHeader { message: String },

    #[error("Invalid status code: {code}")]
    InvalidStatus { code: u16 },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ChainError {
    /// Create a body read error
    pub fn body_read<T: Into<String>>(message: T) -> Self {
        ChainError::BodyRead {
            message: message.into(),
        }
    }

    /// Create an invalid header error
    pub fn invalid_header<T: Into<String>>(message: T) -> Self {
        ChainError::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<T: Into<String>>(message: T) -> Self {
        ChainError::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<T: Into<String>>(message: T) -> Self {
        ChainError::Config {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChainError::BodyRead { .. } => StatusCode::BAD_REQUEST,
            ChainError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ChainError::InvalidHeader { .. }
            | ChainError::InvalidStatus { .. }
            | ChainError::Serialization { .. }
            | ChainError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ChainError::BodyRead { .. } => "BODY_READ_FAILED",
            ChainError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ChainError::InvalidHeader { .. } => "INVALID_HEADER",
            ChainError::InvalidStatus { .. } => "INVALID_STATUS",
            ChainError::Serialization { .. } => "SERIALIZATION_FAILED",
            ChainError::Config { .. } => "CONFIG_ERROR",
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::serialization(err.to_string())
    }
}

impl IntoResponse for ChainError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
