//! Keyed store of local working states.
//!
//! States are created lazily on first access. The pointer (active version +
//! hash) changes only through [`WorkingStateStore::commit`], which writes
//! both halves and marks the state synced in one step.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;
use pdm_types::{snapshot, FileId};
use tracing::debug;

use crate::error::WorkdirResult;
use crate::state::{DiffStatus, LocalPointer, LocalWorkingState};

/// Storage for per-file working states on this machine.
pub trait WorkingStateStore: Send + Sync {
    /// The stored state, or `None` if the file was never observed here.
    fn get(&self, file: &FileId) -> WorkdirResult<Option<LocalWorkingState>>;

    /// The stored state, creating an unreconciled one if absent.
    fn get_or_init(&self, file: &FileId) -> WorkdirResult<LocalWorkingState>;

    /// Atomically move the pointer and mark the state synced.
    fn commit(&self, file: &FileId, pointer: LocalPointer) -> WorkdirResult<LocalWorkingState>;

    /// Record a status observation without touching the pointer.
    fn record_status(&self, file: &FileId, status: DiffStatus) -> WorkdirResult<LocalWorkingState>;

    /// All known states, ordered by file id.
    fn all(&self) -> WorkdirResult<Vec<LocalWorkingState>>;
}

/// In-memory [`WorkingStateStore`], optionally mirrored to a JSON snapshot.
///
/// Changes are applied to a copy, persisted, and then published, so a failed
/// save leaves the visible state exactly as it was.
#[derive(Debug)]
pub struct InMemoryWorkingStateStore {
    states: RwLock<BTreeMap<FileId, LocalWorkingState>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryWorkingStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(BTreeMap::new()),
            snapshot_path: None,
        }
    }

    /// Open a store mirrored to the JSON snapshot at `path`.
    pub fn open(path: impl Into<PathBuf>) -> WorkdirResult<Self> {
        let path = path.into();
        let stored: Vec<LocalWorkingState> = snapshot::load(&path)?.unwrap_or_default();
        debug!(path = %path.display(), states = stored.len(), "opened working state store");
        Ok(Self {
            states: RwLock::new(stored.into_iter().map(|s| (s.file_id, s)).collect()),
            snapshot_path: Some(path),
        })
    }

    fn update(
        &self,
        file: &FileId,
        f: impl FnOnce(&mut LocalWorkingState),
    ) -> WorkdirResult<LocalWorkingState> {
        let mut states = self.states.write().expect("lock poisoned");
        let mut next = states.clone();
        let state = next
            .entry(*file)
            .or_insert_with(|| LocalWorkingState::new(*file));
        f(state);
        let updated = state.clone();
        if let Some(path) = &self.snapshot_path {
            let all: Vec<&LocalWorkingState> = next.values().collect();
            snapshot::save(path, &all)?;
        }
        *states = next;
        Ok(updated)
    }
}

impl Default for InMemoryWorkingStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingStateStore for InMemoryWorkingStateStore {
    fn get(&self, file: &FileId) -> WorkdirResult<Option<LocalWorkingState>> {
        Ok(self.states.read().expect("lock poisoned").get(file).cloned())
    }

    fn get_or_init(&self, file: &FileId) -> WorkdirResult<LocalWorkingState> {
        if let Some(state) = self.get(file)? {
            return Ok(state);
        }
        self.update(file, |_| {})
    }

    fn commit(&self, file: &FileId, pointer: LocalPointer) -> WorkdirResult<LocalWorkingState> {
        self.update(file, |state| {
            state.pointer = Some(pointer);
            state.diff_status = DiffStatus::Synced;
            state.updated_at = Some(Utc::now());
        })
    }

    fn record_status(&self, file: &FileId, status: DiffStatus) -> WorkdirResult<LocalWorkingState> {
        self.update(file, |state| {
            state.diff_status = status;
            state.updated_at = Some(Utc::now());
        })
    }

    fn all(&self) -> WorkdirResult<Vec<LocalWorkingState>> {
        Ok(self.states.read().expect("lock poisoned").values().cloned().collect())
    }
}
