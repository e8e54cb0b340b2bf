//! # AppError
//!
//! Centralized error handling for the archive. Every store, source and the
//! archiver report failures through this one taxonomy so the request layer can
//! map them to a response without knowing which backend failed.

use thiserror::Error;

/// The primary error type for all ra-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Read of an unknown resource (e.g. thread id)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// A watch or request named a source that is not registered
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Network or parse failure talking to an external provider
    #[error("source error: {0}")]
    Source(String),

    /// I/O or connection failure in the persistence engine
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Uniqueness or foreign-key failure reported by the storage engine
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Metadata / image blobs that could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Malformed request input (e.g. an unparsable watch interval)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or wrong admin credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    pub fn thread_not_found(id: &str) -> Self {
        AppError::NotFound("thread".to_string(), id.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// A specialized Result type for archive logic.
pub type Result<T> = std::result::Result<T, AppError>;
