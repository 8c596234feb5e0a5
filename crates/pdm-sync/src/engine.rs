//! The rollback / roll-forward engine.
//!
//! Materializes any recorded version of a file as the local working copy.
//! The engine only ever reads the version log: moving the working copy
//! changes which bytes are on disk and where the local pointer points, never
//! what history contains.

use std::sync::Arc;

use pdm_lock::LockManager;
use pdm_log::VersionLog;
use pdm_store::ContentStore;
use pdm_types::{CheckoutLock, ContentHash, FileId, TrackedFile, UserId, VersionNumber, VersionRecord};
use pdm_workdir::{
    DiffStatus, LocalFileIo, LocalPointer, LocalWorkingState, Observation, Reconciler,
    WorkdirError, WorkingStateStore,
};
use tracing::{debug, info, warn};

use crate::activity::{ActivityEvent, ActivitySink, NullActivitySink};
use crate::busy::{BusyGuard, BusySet};
use crate::error::{SyncError, SyncResult};
use crate::types::{Direction, RollOutcome, RollRequest};

/// Orchestrates the version log, content store, lock manager, file I/O
/// adapter and local working state.
#[derive(Clone)]
pub struct SyncEngine {
    log: Arc<dyn VersionLog>,
    store: Arc<dyn ContentStore>,
    locks: Arc<dyn LockManager>,
    io: Arc<dyn LocalFileIo>,
    local: Arc<dyn WorkingStateStore>,
    activity: Arc<dyn ActivitySink>,
    busy: BusySet,
}

impl SyncEngine {
    pub fn new(
        log: Arc<dyn VersionLog>,
        store: Arc<dyn ContentStore>,
        locks: Arc<dyn LockManager>,
        io: Arc<dyn LocalFileIo>,
        local: Arc<dyn WorkingStateStore>,
    ) -> Self {
        Self {
            log,
            store,
            locks,
            io,
            local,
            activity: Arc::new(NullActivitySink),
            busy: BusySet::new(),
        }
    }

    /// Record successful operations to `sink`.
    pub fn with_activity(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity = sink;
        self
    }

    pub fn activity(&self) -> &Arc<dyn ActivitySink> {
        &self.activity
    }

    /// Mark `file` busy for the lifetime of the returned guard.
    ///
    /// Other workflows that move the local pointer (check-in) claim the same
    /// guard so they never interleave with a rollback.
    pub fn claim(&self, file: &FileId) -> SyncResult<BusyGuard> {
        self.busy
            .try_claim(*file)
            .ok_or(SyncError::OperationInProgress(*file))
    }

    pub fn is_busy(&self, file: &FileId) -> bool {
        self.busy.is_busy(file)
    }

    /// Succeeds only if `actor` currently holds the checkout lock of `file`.
    pub async fn authorize(&self, file: &FileId, actor: &UserId) -> SyncResult<CheckoutLock> {
        match self.locks.holder(file).await? {
            Some(lock) if lock.is_held_by(actor) => Ok(lock),
            other => {
                let holder = other.map(|lock| lock.holder);
                debug!(file = %file, actor = %actor, holder = ?holder, "authorization refused");
                Err(SyncError::NotCheckedOut {
                    file: *file,
                    holder,
                })
            }
        }
    }

    /// Full history of `file`, newest first.
    pub async fn list_versions(&self, file: &FileId) -> SyncResult<Vec<VersionRecord>> {
        Ok(self.log.list_versions(file).await?)
    }

    /// Versions a rollback or roll-forward may target, newest first.
    pub async fn rollback_targets(&self, file: &FileId) -> SyncResult<Vec<VersionNumber>> {
        let tracked = self.log.tracked_file(file).await?;
        let state = self.state_or_new(file)?;
        let versions = self.log.list_versions(file).await?;
        Ok(Reconciler::rollback_targets(
            &versions,
            state.active_version(tracked.head_version),
        ))
    }

    /// The local working state of `file`. A file never observed on this
    /// machine reports a fresh, unreconciled state.
    pub async fn get_local_state(&self, file: &FileId) -> SyncResult<LocalWorkingState> {
        self.log.tracked_file(file).await?;
        self.state_or_new(file)
    }

    /// Last known diff status, without touching the disk.
    pub async fn diff_status(&self, file: &FileId) -> SyncResult<DiffStatus> {
        let tracked = self.log.tracked_file(file).await?;
        let state = self.state_or_new(file)?;
        let active_hash = self.active_hash(&tracked, &state).await?;
        Ok(Reconciler::status(&state, active_hash, Observation::NotObserved))
    }

    /// Hash the on-disk bytes and record the resulting diff status.
    ///
    /// The first observation of a file adopts the newest version whose
    /// content matches the disk, if any.
    pub async fn refresh_status(&self, file: &FileId) -> SyncResult<LocalWorkingState> {
        let _guard = self.claim(file)?;
        let tracked = self.log.tracked_file(file).await?;
        let state = self.state_or_new(file)?;

        let observed = match self.io.read_bytes(&tracked.local_path).await {
            Ok(bytes) => Observation::from_bytes(&bytes),
            Err(WorkdirError::FileMissing(_)) => Observation::Missing,
            Err(source) => {
                warn!(file = %file, error = %source, "failed to read working copy");
                return Err(SyncError::LocalReadFailed {
                    file: *file,
                    source,
                });
            }
        };

        if let (None, Observation::Hash(disk)) = (state.pointer, observed) {
            let versions = self.log.list_versions(file).await?;
            if let Some(pointer) = Reconciler::adopt(&versions, disk) {
                info!(file = %file, version = %pointer.version, "adopted working copy");
                return self.commit_pointer(file, pointer);
            }
        }

        let active_hash = self.active_hash(&tracked, &state).await?;
        let status = Reconciler::status(&state, active_hash, observed);
        debug!(file = %file, status = %status, "refreshed diff status");
        self.local
            .record_status(file, status)
            .map_err(|source| SyncError::LocalWriteFailed {
                file: *file,
                source,
            })
    }

    /// Replace the working copy of a file with the bytes of `target`.
    ///
    /// Steps run strictly in order: authorize, claim, resolve, fetch, write,
    /// commit, audit. A failure at any step returns before the commit, so
    /// the local pointer and hash either both move or neither does.
    pub async fn rollback_or_roll_forward(&self, request: &RollRequest) -> SyncResult<RollOutcome> {
        let RollRequest {
            file_id,
            target,
            actor,
        } = request;

        self.authorize(file_id, actor).await?;
        let _guard = self.claim(file_id)?;

        let tracked = self.log.tracked_file(file_id).await?;
        let record = self.log.get_version(file_id, *target).await?;
        let state = self.state_or_new(file_id)?;
        let from = state.active_version(tracked.head_version);
        let direction = Direction::classify(from, *target);

        if from == *target && state.is_synced() && state.local_hash() == Some(record.content_hash) {
            debug!(file = %file_id, version = %target, "already synced at target version");
            return Ok(RollOutcome {
                file_id: *file_id,
                from_version: from,
                to_version: *target,
                direction,
                head_version: tracked.head_version,
                content_hash: record.content_hash,
                bytes_written: 0,
                changed: false,
            });
        }

        let bytes = self
            .store
            .fetch(&record.content_hash)
            .await
            .map_err(|source| {
                warn!(file = %file_id, version = %target, error = %source, "content fetch failed");
                SyncError::ContentUnavailable {
                    hash: record.content_hash,
                    source,
                }
            })?;

        self.io
            .write_bytes_atomic(&tracked.local_path, &bytes, &record.content_hash)
            .await
            .map_err(|source| {
                warn!(file = %file_id, path = %tracked.local_path.display(), error = %source, "working copy write failed");
                SyncError::LocalWriteFailed {
                    file: *file_id,
                    source,
                }
            })?;

        self.commit_pointer(
            file_id,
            LocalPointer {
                version: record.version,
                hash: record.content_hash,
            },
        )?;

        info!(
            file = %file_id,
            from = %from,
            to = %target,
            head = %tracked.head_version,
            direction = %direction,
            "working copy moved"
        );
        self.activity.record(
            ActivityEvent::new(direction.into(), *file_id, actor.clone())
                .with_versions(Some(from), *target),
        );

        Ok(RollOutcome {
            file_id: *file_id,
            from_version: from,
            to_version: *target,
            direction,
            head_version: tracked.head_version,
            content_hash: record.content_hash,
            bytes_written: bytes.len() as u64,
            changed: true,
        })
    }

    fn state_or_new(&self, file: &FileId) -> SyncResult<LocalWorkingState> {
        let state = self
            .local
            .get(file)
            .map_err(|source| SyncError::LocalReadFailed {
                file: *file,
                source,
            })?;
        Ok(state.unwrap_or_else(|| LocalWorkingState::new(*file)))
    }

    fn commit_pointer(&self, file: &FileId, pointer: LocalPointer) -> SyncResult<LocalWorkingState> {
        self.local
            .commit(file, pointer)
            .map_err(|source| SyncError::LocalWriteFailed {
                file: *file,
                source,
            })
    }

    async fn active_hash(
        &self,
        tracked: &TrackedFile,
        state: &LocalWorkingState,
    ) -> SyncResult<ContentHash> {
        let active = state.active_version(tracked.head_version);
        if active == tracked.head_version {
            return Ok(tracked.head_hash);
        }
        Ok(self.log.get_version(&tracked.id, active).await?.content_hash)
    }
}
