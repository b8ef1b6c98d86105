//! Error types for smarttodo.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using smarttodo's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for smarttodo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    /// Category not found
    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    /// Context entry not found
    #[error("Context entry not found: {0}")]
    ContextNotFound(i64),

    /// Invalid input (bad score range, empty title, unknown enum value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Concurrent modification detected by the persistence layer
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Collapse this error into the kind reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_)
            | Error::TaskNotFound(_)
            | Error::CategoryNotFound(_)
            | Error::ContextNotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Inference(_) | Error::Request(_) => ErrorKind::Unavailable,
            Error::Database(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

/// Caller-facing error classification.
///
/// Batch results carry this instead of the full [`Error`] so they stay
/// cloneable and serializable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unavailable,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
