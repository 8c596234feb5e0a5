use std::path::PathBuf;

use pdm_types::{ContentHash, FileId, FileMetadata, LifecycleState, UserId, VersionNumber};

/// Registration of a new tracked file together with its first version.
///
/// A file never exists in the catalog without at least one version, so the
/// head pointers are always defined.
#[derive(Clone, Debug)]
pub struct NewFile {
    pub id: FileId,
    pub local_path: PathBuf,
    pub relative_path: String,
    pub revision: String,
    pub lifecycle_state: LifecycleState,
    pub metadata: FileMetadata,
    pub comment: String,
    pub content_hash: ContentHash,
    pub size: u64,
    pub author: UserId,
}

/// A check-in on top of `base_version`.
///
/// The log assigns `base_version + 1` and rejects the append if the head has
/// moved since the client read it.
#[derive(Clone, Debug)]
pub struct NewVersion {
    pub file_id: FileId,
    pub base_version: VersionNumber,
    /// New revision label; `None` keeps the current one.
    pub revision: Option<String>,
    pub comment: String,
    pub content_hash: ContentHash,
    pub size: u64,
    pub author: UserId,
}
