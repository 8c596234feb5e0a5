//! Reconciliation between the local overlay and the version log.
//!
//! Everything here is a pure function: no network, no file I/O. The engine
//! gathers the inputs (log records, a fresh hash of the on-disk bytes) and
//! persists the outputs.

use pdm_types::{ContentHash, VersionNumber, VersionRecord};

use crate::state::{DiffStatus, LocalPointer, LocalWorkingState};

/// What the engine learned about the on-disk bytes, if it looked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// No disk read was performed; use the last recorded status.
    NotObserved,
    /// The working copy does not exist.
    Missing,
    /// Hash of the bytes currently on disk.
    Hash(ContentHash),
}

impl Observation {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Hash(ContentHash::of(bytes))
    }
}

/// Pure reconciliation functions.
pub struct Reconciler;

impl Reconciler {
    /// Compute the diff status of `state`.
    ///
    /// `active_hash` is the content hash of the version record numbered
    /// `state.active_version(head)`.
    pub fn status(
        state: &LocalWorkingState,
        active_hash: ContentHash,
        observed: Observation,
    ) -> DiffStatus {
        match (state.pointer, observed) {
            (None, Observation::NotObserved) => DiffStatus::Unknown,
            (None, Observation::Missing) => DiffStatus::Modified,
            (None, Observation::Hash(disk)) if disk == active_hash => DiffStatus::Synced,
            (None, Observation::Hash(_)) => DiffStatus::Modified,
            (Some(pointer), _) if pointer.hash != active_hash => DiffStatus::Modified,
            (Some(_), Observation::NotObserved) => state.diff_status,
            (Some(_), Observation::Missing) => DiffStatus::Modified,
            (Some(pointer), Observation::Hash(disk)) if disk == pointer.hash => DiffStatus::Synced,
            (Some(_), Observation::Hash(_)) => DiffStatus::Modified,
        }
    }

    /// On first observation, find the version the disk bytes belong to.
    ///
    /// `versions` is newest first, so when several versions share the same
    /// content the newest one is adopted.
    pub fn adopt(versions: &[VersionRecord], disk: ContentHash) -> Option<LocalPointer> {
        versions
            .iter()
            .find(|record| record.content_hash == disk)
            .map(|record| LocalPointer {
                version: record.version,
                hash: record.content_hash,
            })
    }

    /// Versions a rollback or roll-forward may target: every version except
    /// the active one, newest first.
    pub fn rollback_targets(versions: &[VersionRecord], active: VersionNumber) -> Vec<VersionNumber> {
        versions
            .iter()
            .map(|record| record.version)
            .filter(|version| *version != active)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdm_types::{FileId, LifecycleState, UserId};

    fn v(n: u32) -> VersionNumber {
        VersionNumber::new(n).unwrap()
    }

    fn history(file_id: FileId, contents: &[&[u8]]) -> Vec<VersionRecord> {
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| VersionRecord {
                file_id,
                version: v(i as u32 + 1),
                revision: "A".into(),
                lifecycle_state: LifecycleState::WorkInProgress,
                comment: String::new(),
                content_hash: ContentHash::of(content),
                size: content.len() as u64,
                created_at: Utc::now(),
                author: UserId::new("alice").unwrap(),
            })
            .rev()
            .collect()
    }

    fn at(version: u32, content: &[u8], status: DiffStatus) -> LocalWorkingState {
        LocalWorkingState {
            file_id: FileId::new(),
            pointer: Some(LocalPointer {
                version: v(version),
                hash: ContentHash::of(content),
            }),
            diff_status: status,
            updated_at: None,
        }
    }

    #[test]
    fn unreconciled_without_observation_is_unknown() {
        let state = LocalWorkingState::new(FileId::new());
        let status = Reconciler::status(&state, ContentHash::of(b"head"), Observation::NotObserved);
        assert_eq!(status, DiffStatus::Unknown);
    }

    #[test]
    fn unreconciled_matching_head_is_synced() {
        let state = LocalWorkingState::new(FileId::new());
        let head = ContentHash::of(b"head");
        assert_eq!(Reconciler::status(&state, head, Observation::Hash(head)), DiffStatus::Synced);
        assert_eq!(
            Reconciler::status(&state, head, Observation::from_bytes(b"other")),
            DiffStatus::Modified
        );
    }

    #[test]
    fn pointer_matching_disk_is_synced() {
        let state = at(3, b"v3", DiffStatus::Unknown);
        let status = Reconciler::status(&state, ContentHash::of(b"v3"), Observation::from_bytes(b"v3"));
        assert_eq!(status, DiffStatus::Synced);
    }

    #[test]
    fn edited_disk_is_modified() {
        let state = at(3, b"v3", DiffStatus::Synced);
        let status = Reconciler::status(&state, ContentHash::of(b"v3"), Observation::from_bytes(b"v3 + edits"));
        assert_eq!(status, DiffStatus::Modified);
    }

    #[test]
    fn missing_file_is_modified() {
        let state = at(3, b"v3", DiffStatus::Synced);
        assert_eq!(
            Reconciler::status(&state, ContentHash::of(b"v3"), Observation::Missing),
            DiffStatus::Modified
        );
    }

    #[test]
    fn not_observed_keeps_recorded_status() {
        let state = at(3, b"v3", DiffStatus::Synced);
        assert_eq!(
            Reconciler::status(&state, ContentHash::of(b"v3"), Observation::NotObserved),
            DiffStatus::Synced
        );
    }

    #[test]
    fn pointer_disagreeing_with_log_is_never_synced() {
        let state = at(3, b"v3", DiffStatus::Synced);
        let status = Reconciler::status(&state, ContentHash::of(b"something else"), Observation::from_bytes(b"v3"));
        assert_eq!(status, DiffStatus::Modified);
    }

    #[test]
    fn adopt_picks_newest_matching_version() {
        let file = FileId::new();
        let versions = history(file, &[b"a", b"b", b"b", b"c"]);
        let pointer = Reconciler::adopt(&versions, ContentHash::of(b"b")).unwrap();
        assert_eq!(pointer.version, v(3));
        assert!(Reconciler::adopt(&versions, ContentHash::of(b"zzz")).is_none());
    }

    #[test]
    fn rollback_targets_exclude_active() {
        let file = FileId::new();
        let versions = history(file, &[b"a", b"b", b"c"]);
        assert_eq!(Reconciler::rollback_targets(&versions, v(2)), vec![v(3), v(1)]);
    }
}
