use async_trait::async_trait;
use pdm_types::{FileId, FileMetadata, LifecycleState, TrackedFile, UserId, VersionNumber, VersionRecord};

use crate::error::{LogError, LogResult};
use crate::types::{NewFile, NewVersion};

/// Read boundary of the version log.
///
/// `list_versions` is always sorted by version number, newest first, and is
/// stable between calls unless a check-in has occurred.
#[async_trait]
pub trait VersionLog: Send + Sync {
    async fn tracked_file(&self, file: &FileId) -> LogResult<TrackedFile>;

    async fn list_files(&self) -> LogResult<Vec<TrackedFile>>;

    async fn list_versions(&self, file: &FileId) -> LogResult<Vec<VersionRecord>>;

    async fn get_version(&self, file: &FileId, version: VersionNumber)
        -> LogResult<VersionRecord>;

    /// The newest record of a file.
    async fn head(&self, file: &FileId) -> LogResult<VersionRecord> {
        self.list_versions(file)
            .await?
            .into_iter()
            .next()
            .ok_or(LogError::FileNotFound(*file))
    }
}

/// Write boundary of the version log, used by the check-in workflow and the
/// catalog editors. The rollback engine never holds one of these.
#[async_trait]
pub trait VersionLogWriter: VersionLog {
    async fn register_file(&self, file: NewFile) -> LogResult<(TrackedFile, VersionRecord)>;

    async fn append(&self, draft: NewVersion) -> LogResult<VersionRecord>;

    async fn set_lifecycle_state(
        &self,
        file: &FileId,
        state: LifecycleState,
    ) -> LogResult<TrackedFile>;

    async fn update_metadata(&self, file: &FileId, metadata: FileMetadata)
        -> LogResult<TrackedFile>;

    /// Update the displayed lock holder. Never used for authorization.
    async fn set_checked_out_by(&self, file: &FileId, holder: Option<UserId>) -> LogResult<()>;
}
