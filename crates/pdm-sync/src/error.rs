use pdm_lock::LockError;
use pdm_log::LogError;
use pdm_store::StoreError;
use pdm_types::{ContentHash, FileId, UserId, VersionNumber};
use pdm_workdir::WorkdirError;
use thiserror::Error;

/// Typed failures surfaced to the presentation layer.
///
/// Every variant leaves the caller's local working state exactly as it was
/// before the call. None of them are retried inside the engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller does not hold the checkout lock.
    #[error("file {file} is not checked out by you{}", holder_suffix(.holder))]
    NotCheckedOut {
        file: FileId,
        holder: Option<UserId>,
    },

    /// The checkout lock belongs to another user.
    #[error("file {file} is checked out by {holder}")]
    AlreadyHeld { file: FileId, holder: UserId },

    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("version {version} not found for file {file}")]
    VersionNotFound {
        file: FileId,
        version: VersionNumber,
    },

    /// The blob for the target version could not be fetched.
    #[error("content {hash} unavailable: {source}")]
    ContentUnavailable {
        hash: ContentHash,
        #[source]
        source: StoreError,
    },

    /// Writing or verifying the working copy failed.
    #[error("local write failed for file {file}: {source}")]
    LocalWriteFailed {
        file: FileId,
        #[source]
        source: WorkdirError,
    },

    /// Reading the working copy (or the local state) failed.
    #[error("local read failed for file {file}: {source}")]
    LocalReadFailed {
        file: FileId,
        #[source]
        source: WorkdirError,
    },

    /// Another rollback / roll-forward for this file is in flight.
    #[error("an operation is already in progress for file {0}")]
    OperationInProgress(FileId),

    /// Version log or lock manager transport failure.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

fn holder_suffix(holder: &Option<UserId>) -> String {
    match holder {
        Some(user) => format!(" (held by {user})"),
        None => String::new(),
    }
}

impl SyncError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotCheckedOut { .. } => "not_checked_out",
            Self::AlreadyHeld { .. } => "already_held",
            Self::FileNotFound(_) => "file_not_found",
            Self::VersionNotFound { .. } => "version_not_found",
            Self::ContentUnavailable { .. } => "content_unavailable",
            Self::LocalWriteFailed { .. } => "local_write_failed",
            Self::LocalReadFailed { .. } => "local_read_failed",
            Self::OperationInProgress(_) => "operation_in_progress",
            Self::Unavailable(_) => "unavailable",
        }
    }

    /// Returns `true` when retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ContentUnavailable { .. } | Self::OperationInProgress(_) | Self::Unavailable(_)
        )
    }
}

impl From<LogError> for SyncError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::FileNotFound(file) => Self::FileNotFound(file),
            LogError::VersionNotFound { file, version } => Self::VersionNotFound { file, version },
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl From<LockError> for SyncError {
    fn from(e: LockError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
