use pdm_types::{
    CheckoutLock, FileMetadata, LifecycleState, TrackedFile, VersionNumber, VersionRecord,
};
use pdm_workdir::{DiffStatus, LocalWorkingState};
use serde::Serialize;

/// A check-in of the current working copy.
#[derive(Clone, Debug)]
pub struct CheckIn {
    pub comment: String,
    /// New revision label; `None` keeps the current one.
    pub revision: Option<String>,
    /// Keep the checkout lock after the check-in.
    pub keep_lock: bool,
}

impl CheckIn {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            revision: None,
            keep_lock: false,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn keep_lock(mut self) -> Self {
        self.keep_lock = true;
        self
    }
}

/// Options for starting to track a file.
#[derive(Clone, Debug)]
pub struct Track {
    pub comment: String,
    pub revision: String,
    pub lifecycle_state: LifecycleState,
    pub metadata: FileMetadata,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            comment: "initial version".into(),
            revision: "A".into(),
            lifecycle_state: LifecycleState::default(),
            metadata: FileMetadata::default(),
        }
    }
}

impl Track {
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    pub fn with_part_number(mut self, part_number: impl Into<String>) -> Self {
        self.metadata.part_number = Some(part_number.into());
        self
    }
}

/// One row of the workspace status listing.
#[derive(Clone, Debug, Serialize)]
pub struct FileStatus {
    pub file: TrackedFile,
    pub active_version: VersionNumber,
    pub diff_status: DiffStatus,
    pub local: LocalWorkingState,
    pub lock: Option<CheckoutLock>,
}

impl FileStatus {
    /// The working copy shows a version other than the head.
    pub fn is_behind_head(&self) -> bool {
        self.active_version != self.file.head_version
    }
}

/// Summary of a completed check-in.
#[derive(Clone, Debug, Serialize)]
pub struct CheckInResult {
    pub record: VersionRecord,
    /// Version the working copy showed before the check-in.
    pub based_on: VersionNumber,
    /// `false` when the lock was kept, or when releasing it failed after the
    /// version was recorded.
    pub lock_released: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let c = CheckIn::new("fix hole pattern").with_revision("B").keep_lock();
        assert_eq!(c.revision.as_deref(), Some("B"));
        assert!(c.keep_lock);

        let t = Track::default().with_title("Bracket").with_part_number("PN-100");
        assert_eq!(t.revision, "A");
        assert_eq!(t.metadata.part_number.as_deref(), Some("PN-100"));
    }
}
