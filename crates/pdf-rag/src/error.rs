//! Error types for the PDF question-answering service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Multipart form has no `file` field
    #[error("No file part")]
    NoFilePart,

    /// `file` field carries an empty filename
    #[error("No selected file")]
    NoSelectedFile,

    /// Filename extension is not in the allowed set
    #[error("Invalid file extension")]
    InvalidExtension,

    /// Malformed or incomplete request body
    #[error("Invalid request")]
    InvalidRequest,

    /// Upload exceeded the configured body limit
    #[error("File too large")]
    PayloadTooLarge,

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector store error
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoFilePart
            | Error::NoSelectedFile
            | Error::InvalidExtension
            | Error::InvalidRequest => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::Embedding(_) | Error::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_)
            | Error::FileParse { .. }
            | Error::VectorStore(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
