//! Error types for the workdir crate.

use std::path::PathBuf;

use pdm_types::ContentHash;

/// Errors that can occur while reading or materializing working copies.
#[derive(Debug, thiserror::Error)]
pub enum WorkdirError {
    /// The working copy does not exist on disk.
    #[error("file missing: {0}")]
    FileMissing(PathBuf),

    /// The bytes read back from the temporary file have the wrong length.
    #[error("short write: expected {expected} bytes, found {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// The bytes read back from the temporary file hash to the wrong value.
    #[error("verification failed: expected {expected}, computed {computed}")]
    VerifyFailed {
        expected: ContentHash,
        computed: ContentHash,
    },

    /// The blocking I/O task was cancelled or panicked.
    #[error("I/O task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for workdir results.
pub type WorkdirResult<T> = Result<T, WorkdirError>;
