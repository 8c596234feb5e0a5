use pdm_types::{ContentHash, FileId, UserId, VersionNumber};
use serde::{Deserialize, Serialize};

/// Which way the working copy moves. Informational only: every direction
/// runs the same algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Rollback,
    RollForward,
    /// Same version, re-materialized over a modified or unverified copy.
    Reapply,
}

impl Direction {
    pub fn classify(from: VersionNumber, to: VersionNumber) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Less => Self::Rollback,
            std::cmp::Ordering::Greater => Self::RollForward,
            std::cmp::Ordering::Equal => Self::Reapply,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Rollback => "rollback",
            Self::RollForward => "roll-forward",
            Self::Reapply => "reapply",
        };
        f.write_str(s)
    }
}

/// A request to materialize `target` as the working copy of `file_id`.
#[derive(Clone, Debug)]
pub struct RollRequest {
    pub file_id: FileId,
    pub target: VersionNumber,
    pub actor: UserId,
}

impl RollRequest {
    pub fn new(file_id: FileId, target: VersionNumber, actor: UserId) -> Self {
        Self {
            file_id,
            target,
            actor,
        }
    }
}

/// Result of a successful rollback / roll-forward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub file_id: FileId,
    pub from_version: VersionNumber,
    pub to_version: VersionNumber,
    pub direction: Direction,
    /// Unchanged by the operation; reported for display.
    pub head_version: VersionNumber,
    pub content_hash: ContentHash,
    pub bytes_written: u64,
    /// `false` when the target was already active and synced.
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> VersionNumber {
        VersionNumber::new(n).unwrap()
    }

    #[test]
    fn classify_direction() {
        assert_eq!(Direction::classify(v(5), v(3)), Direction::Rollback);
        assert_eq!(Direction::classify(v(2), v(5)), Direction::RollForward);
        assert_eq!(Direction::classify(v(4), v(4)), Direction::Reapply);
    }
}
