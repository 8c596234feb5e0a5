use thiserror::Error;

/// Errors produced by type parsing and conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid version number: {0}")]
    InvalidVersion(String),

    #[error("unknown lifecycle state: {0}")]
    UnknownLifecycleState(String),

    #[error("user id must not be empty")]
    EmptyUserId,
}
