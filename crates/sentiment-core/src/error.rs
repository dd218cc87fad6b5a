//! Error types for the sentiment server.
//!
//! Startup errors (model loading, socket bind) propagate to the process
//! entry point and abort startup. Session errors are caught at the session
//! boundary and resolve by closing that one connection.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sentiment library.
#[derive(Debug, Error)]
pub enum SentimentError {
    // Model loading errors
    #[error("Model directory not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Tokenizer error: {message}")]
    Tokenizer { message: String },

    #[error("Inference error: {message}")]
    Inference { message: String },

    // Wire protocol errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // I/O errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for sentiment operations.
pub type Result<T> = std::result::Result<T, SentimentError>;

// Conversion implementations for common error types

impl From<std::io::Error> for SentimentError {
    fn from(err: std::io::Error) -> Self {
        SentimentError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SentimentError {
    fn from(err: serde_json::Error) -> Self {
        SentimentError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<ort::Error> for SentimentError {
    fn from(err: ort::Error) -> Self {
        SentimentError::Inference {
            message: err.to_string(),
        }
    }
}
