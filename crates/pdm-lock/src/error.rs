//! Error types for lock operations.
//!
//! Contention is not an error: a lock held by someone else is reported as
//! [`AcquireOutcome::AlreadyHeld`](crate::AcquireOutcome::AlreadyHeld).

use thiserror::Error;

/// Errors that can occur while talking to the lock authority.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock authority could not be reached.
    #[error("lock manager unavailable: {0}")]
    Unavailable(String),

    /// I/O error while persisting the lock table.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for lock operations.
pub type LockResult<T> = std::result::Result<T, LockError>;
