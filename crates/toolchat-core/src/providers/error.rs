//! Model backend error types

use thiserror::Error;

/// Errors that can occur while talking to a model backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Missing API key
    #[error("API key is required for {backend}")]
    MissingApiKey { backend: String },

    /// API request failed
    #[error("{backend} API error: {message}")]
    ApiError { backend: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Response could not be interpreted
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Create an API error
    pub fn api_error(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(backend: impl Into<String>) -> Self {
        Self::MissingApiKey {
            backend: backend.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
