//! Error types for the overlay VFS.

use thiserror::Error;

/// Errors that can occur in VFS operations.
///
/// Errors coming out of a delegated driver are returned to the caller
/// exactly as that driver produced them.
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Path too long")]
    PathTooLong,

    #[error("Name too long")]
    NameTooLong,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Driver already registered: {0}")]
    DriverExists(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;
