//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Master key error: {0}")]
    MasterKey(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported profile document version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    #[error("Profile document is read-only: {0}")]
    ReadOnly(String),

    #[error("Failed to determine home directory")]
    HomeDirUnavailable,
}

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
