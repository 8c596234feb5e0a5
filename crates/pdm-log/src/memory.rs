use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use pdm_types::{
    snapshot, FileId, FileMetadata, LifecycleState, TrackedFile, UserId, VersionNumber,
    VersionRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LogError, LogResult};
use crate::traits::{VersionLog, VersionLogWriter};
use crate::types::{NewFile, NewVersion};

/// In-memory version log for tests, local demos, and embedding.
///
/// When opened with [`InMemoryVersionLog::open`], every mutation is mirrored
/// to a JSON snapshot before it becomes visible: the new state is built on a
/// copy, persisted atomically, and only then swapped in. A failed write
/// leaves both the file and the in-memory state unchanged.
pub struct InMemoryVersionLog {
    inner: RwLock<LogState>,
    snapshot_path: Option<PathBuf>,
    offline: AtomicBool,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FileEntry>", into = "Vec<FileEntry>")]
struct LogState {
    files: BTreeMap<FileId, FileEntry>,
}

impl From<Vec<FileEntry>> for LogState {
    fn from(entries: Vec<FileEntry>) -> Self {
        Self {
            files: entries.into_iter().map(|e| (e.file.id, e)).collect(),
        }
    }
}

impl From<LogState> for Vec<FileEntry> {
    fn from(state: LogState) -> Self {
        state.files.into_values().collect()
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct FileEntry {
    file: TrackedFile,
    /// Ascending by version number; index `i` holds version `i + 1`.
    versions: Vec<VersionRecord>,
}

impl InMemoryVersionLog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LogState::default()),
            snapshot_path: None,
            offline: AtomicBool::new(false),
        }
    }

    /// Open a log mirrored to the JSON snapshot at `path`, loading it if it
    /// exists.
    pub fn open(path: impl Into<PathBuf>) -> LogResult<Self> {
        let path = path.into();
        let state: LogState = snapshot::load(&path)?.unwrap_or_default();
        debug!(path = %path.display(), files = state.files.len(), "opened version log");
        Ok(Self {
            inner: RwLock::new(state),
            snapshot_path: Some(path),
            offline: AtomicBool::new(false),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Simulate loss (or recovery) of the transport.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total number of version records across all files.
    pub fn record_count(&self) -> usize {
        self.inner
            .read()
            .expect("lock poisoned")
            .files
            .values()
            .map(|e| e.versions.len())
            .sum()
    }

    fn ensure_online(&self) -> LogResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LogError::Unavailable("version log is offline".into()));
        }
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&LogState) -> LogResult<R>) -> LogResult<R> {
        self.ensure_online()?;
        let state = self.inner.read().expect("lock poisoned");
        f(&state)
    }

    /// Apply `f` to a copy of the state, persist the copy, then publish it.
    fn mutate<R>(&self, f: impl FnOnce(&mut LogState) -> LogResult<R>) -> LogResult<R> {
        self.ensure_online()?;
        let mut state = self.inner.write().expect("lock poisoned");
        let mut next = state.clone();
        let result = f(&mut next)?;
        if let Some(path) = &self.snapshot_path {
            snapshot::save(path, &next)?;
        }
        *state = next;
        Ok(result)
    }
}

impl Default for InMemoryVersionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVersionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let files = self.inner.read().expect("lock poisoned").files.len();
        f.debug_struct("InMemoryVersionLog")
            .field("files", &files)
            .field("snapshot_path", &self.snapshot_path)
            .finish()
    }
}

fn entry<'a>(state: &'a LogState, file: &FileId) -> LogResult<&'a FileEntry> {
    state.files.get(file).ok_or(LogError::FileNotFound(*file))
}

fn entry_mut<'a>(state: &'a mut LogState, file: &FileId) -> LogResult<&'a mut FileEntry> {
    state.files.get_mut(file).ok_or(LogError::FileNotFound(*file))
}

#[async_trait]
impl VersionLog for InMemoryVersionLog {
    async fn tracked_file(&self, file: &FileId) -> LogResult<TrackedFile> {
        self.read(|state| Ok(entry(state, file)?.file.clone()))
    }

    async fn list_files(&self) -> LogResult<Vec<TrackedFile>> {
        self.read(|state| Ok(state.files.values().map(|e| e.file.clone()).collect()))
    }

    async fn list_versions(&self, file: &FileId) -> LogResult<Vec<VersionRecord>> {
        self.read(|state| Ok(entry(state, file)?.versions.iter().rev().cloned().collect()))
    }

    async fn get_version(
        &self,
        file: &FileId,
        version: VersionNumber,
    ) -> LogResult<VersionRecord> {
        self.read(|state| {
            let versions = &entry(state, file)?.versions;
            (version.get() as usize)
                .checked_sub(1)
                .and_then(|index| versions.get(index))
                .cloned()
                .ok_or(LogError::VersionNotFound {
                    file: *file,
                    version,
                })
        })
    }

    async fn head(&self, file: &FileId) -> LogResult<VersionRecord> {
        self.read(|state| {
            entry(state, file)?
                .versions
                .last()
                .cloned()
                .ok_or(LogError::FileNotFound(*file))
        })
    }
}

#[async_trait]
impl VersionLogWriter for InMemoryVersionLog {
    async fn register_file(&self, new: NewFile) -> LogResult<(TrackedFile, VersionRecord)> {
        let registered = self.mutate(|state| {
            if state.files.contains_key(&new.id) {
                return Err(LogError::AlreadyRegistered(new.id));
            }
            let record = VersionRecord {
                file_id: new.id,
                version: VersionNumber::FIRST,
                revision: new.revision.clone(),
                lifecycle_state: new.lifecycle_state,
                comment: new.comment,
                content_hash: new.content_hash,
                size: new.size,
                created_at: Utc::now(),
                author: new.author,
            };
            let file = TrackedFile {
                id: new.id,
                local_path: new.local_path,
                relative_path: new.relative_path,
                head_version: VersionNumber::FIRST,
                head_hash: new.content_hash,
                revision: new.revision,
                lifecycle_state: new.lifecycle_state,
                metadata: new.metadata,
                checked_out_by: None,
            };
            state.files.insert(
                new.id,
                FileEntry {
                    file: file.clone(),
                    versions: vec![record.clone()],
                },
            );
            Ok((file, record))
        })?;
        info!(file = %registered.0.id, path = %registered.0.relative_path, "registered tracked file");
        Ok(registered)
    }

    async fn append(&self, draft: NewVersion) -> LogResult<VersionRecord> {
        let record = self.mutate(|state| {
            let entry = entry_mut(state, &draft.file_id)?;
            let head = entry.file.head_version;
            if draft.base_version != head {
                return Err(LogError::StaleHead {
                    file: draft.file_id,
                    expected: draft.base_version,
                    actual: head,
                });
            }
            let revision = draft.revision.unwrap_or_else(|| entry.file.revision.clone());
            let record = VersionRecord {
                file_id: draft.file_id,
                version: head.next(),
                revision: revision.clone(),
                lifecycle_state: entry.file.lifecycle_state,
                comment: draft.comment,
                content_hash: draft.content_hash,
                size: draft.size,
                created_at: Utc::now(),
                author: draft.author,
            };
            entry.versions.push(record.clone());
            entry.file.head_version = record.version;
            entry.file.head_hash = record.content_hash;
            entry.file.revision = revision;
            Ok(record)
        })?;
        info!(file = %record.file_id, version = %record.version, "appended version");
        Ok(record)
    }

    async fn set_lifecycle_state(
        &self,
        file: &FileId,
        lifecycle: LifecycleState,
    ) -> LogResult<TrackedFile> {
        self.mutate(|state| {
            let entry = entry_mut(state, file)?;
            entry.file.lifecycle_state = lifecycle;
            Ok(entry.file.clone())
        })
    }

    async fn update_metadata(
        &self,
        file: &FileId,
        metadata: FileMetadata,
    ) -> LogResult<TrackedFile> {
        self.mutate(|state| {
            let entry = entry_mut(state, file)?;
            entry.file.metadata = metadata;
            Ok(entry.file.clone())
        })
    }

    async fn set_checked_out_by(&self, file: &FileId, holder: Option<UserId>) -> LogResult<()> {
        self.mutate(|state| {
            entry_mut(state, file)?.file.checked_out_by = holder;
            Ok(())
        })
    }
}
