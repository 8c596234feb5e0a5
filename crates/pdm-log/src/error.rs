use pdm_types::{FileId, VersionNumber};

/// Errors produced by version log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("version {version} not found for file {file}")]
    VersionNotFound {
        file: FileId,
        version: VersionNumber,
    },

    #[error("file already registered: {0}")]
    AlreadyRegistered(FileId),

    /// A check-in was based on a head that is no longer current.
    #[error("stale head for file {file}: expected base {expected}, log head is {actual}")]
    StaleHead {
        file: FileId,
        expected: VersionNumber,
        actual: VersionNumber,
    },

    /// The log could not be reached.
    #[error("version log unavailable: {0}")]
    Unavailable(String),

    #[error("persistence error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for version log operations.
pub type LogResult<T> = Result<T, LogError>;
