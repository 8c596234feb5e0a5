//! Local working-state types.

use chrono::{DateTime, Utc};
use pdm_types::{ContentHash, FileId, VersionNumber};
use serde::{Deserialize, Serialize};

/// Whether the local copy matches the version it claims to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// Byte-identical to the active version.
    Synced,
    /// Edited on disk (or missing) since the last reconciliation.
    Modified,
    /// Not reconciled yet.
    #[default]
    Unknown,
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Synced => "synced",
            Self::Modified => "modified",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The version materialized on disk and the hash of the bytes written for it.
///
/// The two halves are one value so that neither can be updated alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPointer {
    pub version: VersionNumber,
    pub hash: ContentHash,
}

/// Client-local overlay for one tracked file on this machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalWorkingState {
    pub file_id: FileId,
    /// `None` until the engine first materializes or adopts a version.
    pub pointer: Option<LocalPointer>,
    pub diff_status: DiffStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LocalWorkingState {
    /// Fresh, unreconciled state.
    pub fn new(file_id: FileId) -> Self {
        Self {
            file_id,
            pointer: None,
            diff_status: DiffStatus::Unknown,
            updated_at: None,
        }
    }

    /// The active version, defaulting to the log head when no pointer is set.
    pub fn active_version(&self, head: VersionNumber) -> VersionNumber {
        self.pointer.map(|p| p.version).unwrap_or(head)
    }

    /// Hash of the bytes last written or verified by the engine.
    pub fn local_hash(&self) -> Option<ContentHash> {
        self.pointer.map(|p| p.hash)
    }

    pub fn is_synced(&self) -> bool {
        self.diff_status == DiffStatus::Synced
    }
}
