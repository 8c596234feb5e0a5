use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::ids::{FileId, UserId};
use crate::lifecycle::LifecycleState;
use crate::version::VersionNumber;

/// Immutable record of one committed revision of a tracked file.
///
/// Created exactly once by the check-in workflow. Revision label and
/// lifecycle state are captured as of the commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub file_id: FileId,
    pub version: VersionNumber,
    pub revision: String,
    pub lifecycle_state: LifecycleState,
    pub comment: String,
    pub content_hash: ContentHash,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub author: UserId,
}

impl VersionRecord {
    /// Returns `true` if this record's content equals `other`'s content.
    pub fn same_content(&self, other: &VersionRecord) -> bool {
        self.content_hash == other.content_hash
    }
}
