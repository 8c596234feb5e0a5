use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::ids::{FileId, UserId};
use crate::lifecycle::LifecycleState;
use crate::version::VersionNumber;

/// Free-text descriptive metadata of a tracked file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub title: Option<String>,
    pub part_number: Option<String>,
    pub description: Option<String>,
}

/// Catalog entry for one PDM-managed file.
///
/// `head_version` and `head_hash` are authoritative pointers into the Version
/// Log. They only move when a new version is appended (check-in), never on
/// rollback or roll-forward of a local working copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub id: FileId,
    /// Absolute path of the working copy on this machine.
    pub local_path: PathBuf,
    /// Path relative to the workspace root, shared across machines.
    pub relative_path: String,
    pub head_version: VersionNumber,
    pub head_hash: ContentHash,
    pub revision: String,
    pub lifecycle_state: LifecycleState,
    pub metadata: FileMetadata,
    /// Mirror of the lock holder for display; the lock manager is the
    /// authority and this field is never consulted for authorization.
    pub checked_out_by: Option<UserId>,
}

impl TrackedFile {
    /// Returns `true` if `user` is the displayed lock holder.
    pub fn is_checked_out_by(&self, user: &UserId) -> bool {
        self.checked_out_by.as_ref() == Some(user)
    }
}
