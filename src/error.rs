//! Crate-wide error taxonomy.

use thiserror::Error;

/// Convenience alias for `Result<T, MemoryError>`.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors surfaced to callers of the memory engine.
///
/// Mirrors the taxonomy in the specification: fatal-to-operation variants
/// leave engine state unchanged, recoverable-background variants are retried
/// by the compression scheduler, and `SessionQuarantined` marks a session as
/// permanently degraded without deleting it.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid project type for this operation")]
    InvalidProjectType,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("confirmation required")]
    ConfirmationRequired,

    #[error("encryption required for this project type")]
    EncryptionRequired,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("scheduler error: {0}")]
    SchedulerError(String),

    #[error("embedding collaborator unavailable")]
    EmbeddingUnavailable,

    #[error("llm collaborator unavailable")]
    LLMUnavailable,

    #[error("session quarantined: {0}")]
    SessionQuarantined(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}

/// Bulk-deletion failures collected per session so one failure never blocks
/// the rest of the batch (spec: medical deletion must be independently
/// atomic per session).
#[derive(Debug, Error)]
#[error("{session_id}: {source}")]
pub struct SessionDeletionFailure {
    pub session_id: String,
    #[source]
    pub source: MemoryError,
}
