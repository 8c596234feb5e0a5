use std::path::{Path, PathBuf};
use std::sync::Arc;

use pdm_lock::{AcquireOutcome, InMemoryLockManager, LockManager, ReleaseOutcome};
use pdm_log::{
    HistoryValidator, InMemoryVersionLog, NewFile, NewVersion, ValidationReport, VersionLogWriter,
};
use pdm_store::{ContentStore, FsContentStore, InMemoryContentStore};
use pdm_sync::{
    ActivityEvent, ActivityKind, ActivitySink, JsonlActivityLog, NullActivitySink, RollOutcome,
    RollRequest, SyncEngine, SyncError,
};
use pdm_types::{
    CheckoutLock, FileId, FileMetadata, LifecycleState, TrackedFile, UserId, VersionNumber,
    VersionRecord,
};
use pdm_workdir::{
    DiffStatus, FsFileIo, InMemoryWorkingStateStore, LocalFileIo, LocalPointer,
    LocalWorkingState, WorkingStateStore,
};
use tracing::{debug, info, warn};

use crate::checkin::{CheckIn, CheckInResult, FileStatus, Track};
use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};

/// Component backends of a [`PdmClient`].
pub struct Backends<L> {
    pub log: Arc<L>,
    pub store: Arc<dyn ContentStore>,
    pub locks: Arc<dyn LockManager>,
    pub io: Arc<dyn LocalFileIo>,
    pub local: Arc<dyn WorkingStateStore>,
    pub activity: Arc<dyn ActivitySink>,
}

/// High-level PDM client acting as one user.
#[derive(Clone)]
pub struct PdmClient {
    root: Option<PathBuf>,
    user: UserId,
    log: Arc<dyn VersionLogWriter>,
    store: Arc<dyn ContentStore>,
    locks: Arc<dyn LockManager>,
    io: Arc<dyn LocalFileIo>,
    local: Arc<dyn WorkingStateStore>,
    engine: SyncEngine,
}

impl PdmClient {
    pub fn from_backends<L>(user: UserId, root: Option<PathBuf>, backends: Backends<L>) -> Self
    where
        L: VersionLogWriter + 'static,
    {
        let engine = SyncEngine::new(
            backends.log.clone(),
            backends.store.clone(),
            backends.locks.clone(),
            backends.io.clone(),
            backends.local.clone(),
        )
        .with_activity(backends.activity);
        Self {
            root,
            user,
            log: backends.log,
            store: backends.store,
            locks: backends.locks,
            io: backends.io,
            local: backends.local,
            engine,
        }
    }

    /// A client over in-memory backends. Working copies still live on the
    /// real filesystem.
    pub fn in_memory(user: UserId) -> Self {
        Self::from_backends(
            user,
            None,
            Backends {
                log: Arc::new(InMemoryVersionLog::new()),
                store: Arc::new(InMemoryContentStore::new()),
                locks: Arc::new(InMemoryLockManager::new()),
                io: Arc::new(FsFileIo::new()),
                local: Arc::new(InMemoryWorkingStateStore::new()),
                activity: Arc::new(NullActivitySink),
            },
        )
    }

    /// Write `config` to `.pdm/config.toml` under `root`, returning its path.
    pub fn init_workspace(root: &Path, config: &ClientConfig) -> SdkResult<PathBuf> {
        let path = ClientConfig::path_in(root);
        if path.exists() {
            return Err(SdkError::AlreadyInitialized(root.to_path_buf()));
        }
        config.save(&path)?;
        info!(root = %root.display(), "initialized workspace");
        Ok(path)
    }

    /// Initialize the workspace at `root` and open it.
    pub fn init(root: &Path, config: &ClientConfig) -> SdkResult<Self> {
        Self::init_workspace(root, config)?;
        Self::open(root)
    }

    /// Open the workspace at `root` as the configured user.
    pub fn open(root: &Path) -> SdkResult<Self> {
        Self::open_as(root, None)
    }

    /// Open the workspace at `root`, acting as `user` if given.
    pub fn open_as(root: &Path, user: Option<UserId>) -> SdkResult<Self> {
        let root = std::path::absolute(root)?;
        let path = ClientConfig::path_in(&root);
        if !path.exists() {
            return Err(SdkError::NotInitialized(root));
        }
        let config = ClientConfig::load(&path)?;
        let user = match user {
            Some(user) => user,
            None => config.user_id()?,
        };

        let state = config.state_path(&root);
        let activity: Arc<dyn ActivitySink> = if config.record_activity {
            Arc::new(JsonlActivityLog::new(state.join("activity.jsonl")))
        } else {
            Arc::new(NullActivitySink)
        };
        let backends = Backends {
            log: Arc::new(InMemoryVersionLog::open(state.join("log.json"))?),
            store: Arc::new(FsContentStore::open(state.join("objects"))?),
            locks: Arc::new(InMemoryLockManager::open(state.join("locks.json"))?),
            io: Arc::new(FsFileIo::new()),
            local: Arc::new(InMemoryWorkingStateStore::open(state.join("local.json"))?),
            activity,
        };
        debug!(root = %root.display(), user = %user, "opened workspace");
        Ok(Self::from_backends(user, Some(root), backends))
    }

    /// The same backends, acting as another user.
    pub fn as_user(&self, user: UserId) -> Self {
        Self {
            user,
            ..self.clone()
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    // ---- Catalog ----

    /// Start tracking the file at `path`; its current bytes become version 1.
    pub async fn track(&self, path: &Path, options: Track) -> SdkResult<TrackedFile> {
        let local_path = self.absolute(path)?;
        let relative_path = self.relative_path(&local_path);
        let files = self.log.list_files().await?;
        if files.iter().any(|f| f.relative_path == relative_path) {
            return Err(SdkError::AlreadyTracked(relative_path));
        }

        let bytes = self.io.read_bytes(&local_path).await?;
        let hash = self.store.put(&bytes).await?;
        let (file, record) = self
            .log
            .register_file(NewFile {
                id: FileId::new(),
                local_path,
                relative_path,
                revision: options.revision,
                lifecycle_state: options.lifecycle_state,
                metadata: options.metadata,
                comment: options.comment,
                content_hash: hash,
                size: bytes.len() as u64,
                author: self.user.clone(),
            })
            .await?;
        self.local.commit(
            &file.id,
            LocalPointer {
                version: record.version,
                hash: record.content_hash,
            },
        )?;

        info!(file = %file.id, path = %file.relative_path, "tracking file");
        self.record(
            ActivityEvent::new(ActivityKind::CheckIn, file.id, self.user.clone())
                .with_versions(None, record.version)
                .with_detail("tracked"),
        );
        Ok(file)
    }

    pub async fn list_files(&self) -> SdkResult<Vec<TrackedFile>> {
        Ok(self.log.list_files().await?)
    }

    pub async fn tracked_file(&self, file: &FileId) -> SdkResult<TrackedFile> {
        Ok(self.log.tracked_file(file).await?)
    }

    /// Find a tracked file by id, id prefix, or workspace path.
    pub async fn resolve(&self, query: &str) -> SdkResult<TrackedFile> {
        if let Ok(id) = query.parse::<FileId>() {
            return self.tracked_file(&id).await;
        }
        let normalized = query.replace('\\', "/");
        let absolute = self.absolute(Path::new(query)).ok();
        let mut matches: Vec<TrackedFile> = self
            .log
            .list_files()
            .await?
            .into_iter()
            .filter(|f| {
                f.relative_path == normalized
                    || absolute.as_deref() == Some(f.local_path.as_path())
                    || (query.len() >= 4 && f.id.to_string().starts_with(query))
            })
            .collect();
        match matches.len() {
            0 => Err(SdkError::NotTracked(query.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(SdkError::Ambiguous(query.to_string())),
        }
    }

    /// Change the lifecycle state. Does not require the checkout lock.
    pub async fn set_lifecycle_state(
        &self,
        file: &FileId,
        state: LifecycleState,
    ) -> SdkResult<TrackedFile> {
        let updated = self.log.set_lifecycle_state(file, state).await?;
        info!(file = %file, state = %state, "lifecycle state changed");
        self.record(
            ActivityEvent::new(ActivityKind::StateChanged, *file, self.user.clone())
                .with_detail(format!("lifecycle {state}")),
        );
        Ok(updated)
    }

    /// Replace the descriptive metadata. Requires the checkout lock.
    pub async fn update_metadata(
        &self,
        file: &FileId,
        metadata: FileMetadata,
    ) -> SdkResult<TrackedFile> {
        self.engine.authorize(file, &self.user).await?;
        let updated = self.log.update_metadata(file, metadata).await?;
        info!(file = %file, "metadata updated");
        self.record(
            ActivityEvent::new(ActivityKind::StateChanged, *file, self.user.clone())
                .with_detail("metadata updated"),
        );
        Ok(updated)
    }

    // ---- Locks ----

    /// Acquire the checkout lock for the acting user.
    pub async fn checkout(&self, file: &FileId) -> SdkResult<CheckoutLock> {
        self.log.tracked_file(file).await?;
        match self.locks.try_acquire(file, &self.user).await? {
            AcquireOutcome::Acquired(lock) => {
                self.mirror_holder(file, Some(self.user.clone())).await;
                info!(file = %file, user = %self.user, "checked out");
                self.record(ActivityEvent::new(ActivityKind::Checkout, *file, self.user.clone()));
                Ok(lock)
            }
            AcquireOutcome::AlreadyHeld { holder } => {
                Err(SyncError::AlreadyHeld { file: *file, holder }.into())
            }
        }
    }

    /// Release the checkout lock held by the acting user.
    pub async fn release(&self, file: &FileId) -> SdkResult<()> {
        match self.locks.release(file, &self.user).await? {
            ReleaseOutcome::Released => {
                self.mirror_holder(file, None).await;
                info!(file = %file, user = %self.user, "released");
                self.record(ActivityEvent::new(ActivityKind::Release, *file, self.user.clone()));
                Ok(())
            }
            ReleaseOutcome::NotHolder { holder } => {
                Err(SyncError::NotCheckedOut { file: *file, holder }.into())
            }
        }
    }

    pub async fn locks(&self) -> SdkResult<Vec<CheckoutLock>> {
        Ok(self.locks.list_locks().await?)
    }

    /// Copy the lock holder into the log's `checked_out_by` field.
    ///
    /// The lock manager stays authoritative, so a failure here is logged and
    /// the lock operation still succeeds.
    async fn mirror_holder(&self, file: &FileId, holder: Option<UserId>) {
        if let Err(e) = self.log.set_checked_out_by(file, holder).await {
            warn!(file = %file, error = %e, "failed to record lock holder in the version log");
        }
    }

    // ---- Check-in ----

    /// Record the current working copy as a new version on top of the head.
    ///
    /// The new version is always `head + 1`, whichever version the working
    /// copy was rolled to before editing.
    pub async fn check_in(&self, file: &FileId, request: CheckIn) -> SdkResult<CheckInResult> {
        self.engine.authorize(file, &self.user).await?;
        let guard = self.engine.claim(file)?;

        let tracked = self.log.tracked_file(file).await?;
        let based_on = self
            .engine
            .get_local_state(file)
            .await?
            .active_version(tracked.head_version);
        let bytes = self.io.read_bytes(&tracked.local_path).await?;
        let hash = self.store.put(&bytes).await?;
        let record = self
            .log
            .append(NewVersion {
                file_id: *file,
                base_version: tracked.head_version,
                revision: request.revision,
                comment: request.comment,
                content_hash: hash,
                size: bytes.len() as u64,
                author: self.user.clone(),
            })
            .await?;
        self.local.commit(
            file,
            LocalPointer {
                version: record.version,
                hash: record.content_hash,
            },
        )?;
        drop(guard);

        info!(file = %file, version = %record.version, based_on = %based_on, "checked in");
        self.record(
            ActivityEvent::new(ActivityKind::CheckIn, *file, self.user.clone())
                .with_versions(Some(based_on), record.version),
        );

        // The version is recorded; a failed release must not turn into an
        // error the caller would answer with a second check-in.
        let lock_released = !request.keep_lock
            && match self.release(file).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        file = %file,
                        version = %record.version,
                        error = %e,
                        "checked in but the lock was not released"
                    );
                    false
                }
            };
        Ok(CheckInResult {
            record,
            based_on,
            lock_released,
        })
    }

    // ---- History and working copy ----

    pub async fn list_versions(&self, file: &FileId) -> SdkResult<Vec<VersionRecord>> {
        Ok(self.engine.list_versions(file).await?)
    }

    pub async fn get_local_state(&self, file: &FileId) -> SdkResult<LocalWorkingState> {
        Ok(self.engine.get_local_state(file).await?)
    }

    /// Materialize `target` as the working copy of `file`.
    pub async fn rollback_or_roll_forward(
        &self,
        file: &FileId,
        target: VersionNumber,
    ) -> SdkResult<RollOutcome> {
        let request = RollRequest::new(*file, target, self.user.clone());
        Ok(self.engine.rollback_or_roll_forward(&request).await?)
    }

    pub async fn diff_status(&self, file: &FileId) -> SdkResult<DiffStatus> {
        Ok(self.engine.diff_status(file).await?)
    }

    pub async fn refresh_status(&self, file: &FileId) -> SdkResult<LocalWorkingState> {
        Ok(self.engine.refresh_status(file).await?)
    }

    /// Refresh every tracked file. Files busy with another operation are
    /// skipped and left out of the result.
    pub async fn refresh_all(&self) -> SdkResult<Vec<LocalWorkingState>> {
        let mut states = Vec::new();
        for file in self.log.list_files().await? {
            match self.engine.refresh_status(&file.id).await {
                Ok(state) => states.push(state),
                Err(SyncError::OperationInProgress(id)) => {
                    debug!(file = %id, "skipping busy file during refresh");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(states)
    }

    /// Check the stored history of `file` for gaps, duplicates and ordering
    /// breaks.
    pub async fn verify_history(&self, file: &FileId) -> SdkResult<ValidationReport> {
        let tracked = self.log.tracked_file(file).await?;
        let versions = self.log.list_versions(file).await?;
        Ok(HistoryValidator::validate_file(&tracked, &versions))
    }

    /// One row per tracked file, using cached diff statuses.
    pub async fn status(&self) -> SdkResult<Vec<FileStatus>> {
        let files = self.log.list_files().await?;
        let mut rows = Vec::with_capacity(files.len());
        for file in files {
            let local = self.engine.get_local_state(&file.id).await?;
            let diff_status = self.engine.diff_status(&file.id).await?;
            let lock = self.locks.holder(&file.id).await?;
            rows.push(FileStatus {
                active_version: local.active_version(file.head_version),
                file,
                diff_status,
                local,
                lock,
            });
        }
        Ok(rows)
    }

    /// Wait until every recorded activity event has been written.
    pub async fn flush_activity(&self) {
        self.engine.activity().flush().await;
    }

    fn record(&self, event: ActivityEvent) {
        self.engine.activity().record(event);
    }

    fn absolute(&self, path: &Path) -> SdkResult<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        match &self.root {
            Some(root) => Ok(root.join(path)),
            None => Ok(std::path::absolute(path)?),
        }
    }

    fn relative_path(&self, absolute: &Path) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| absolute.strip_prefix(root).ok())
            .unwrap_or(absolute);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pdm_lock::{LockError, LockResult};
    use pdm_types::ContentHash;

    /// Grants and reports locks normally but cannot reach the authority to
    /// release them.
    struct ReleaseUnavailable(InMemoryLockManager);

    #[async_trait]
    impl LockManager for ReleaseUnavailable {
        async fn try_acquire(&self, file: &FileId, user: &UserId) -> LockResult<AcquireOutcome> {
            self.0.try_acquire(file, user).await
        }

        async fn release(&self, _file: &FileId, _user: &UserId) -> LockResult<ReleaseOutcome> {
            Err(LockError::Unavailable("connection reset".into()))
        }

        async fn holder(&self, file: &FileId) -> LockResult<Option<CheckoutLock>> {
            self.0.holder(file).await
        }

        async fn list_locks(&self) -> LockResult<Vec<CheckoutLock>> {
            self.0.list_locks().await
        }
    }

    fn v(n: u32) -> VersionNumber {
        VersionNumber::new(n).unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn bob() -> UserId {
        UserId::new("bob").unwrap()
    }

    async fn tracked_with_versions(
        client: &PdmClient,
        path: &Path,
        versions: u32,
    ) -> TrackedFile {
        std::fs::write(path, b"rev 1").unwrap();
        let file = client.track(path, Track::default()).await.unwrap();
        client.checkout(&file.id).await.unwrap();
        for n in 2..=versions {
            std::fs::write(path, format!("rev {n}")).unwrap();
            client
                .check_in(&file.id, CheckIn::new(format!("rev {n}")).keep_lock())
                .await
                .unwrap();
        }
        client.tracked_file(&file.id).await.unwrap()
    }

    #[tokio::test]
    async fn track_creates_first_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.step");
        std::fs::write(&path, b"solid body").unwrap();
        let client = PdmClient::in_memory(alice());

        let file = client
            .track(&path, Track::default().with_part_number("PN-7"))
            .await
            .unwrap();
        assert_eq!(file.head_version, VersionNumber::FIRST);
        assert_eq!(file.head_hash, ContentHash::of(b"solid body"));
        assert_eq!(file.metadata.part_number.as_deref(), Some("PN-7"));

        let state = client.get_local_state(&file.id).await.unwrap();
        assert_eq!(state.pointer.unwrap().version, VersionNumber::FIRST);
        assert_eq!(state.diff_status, DiffStatus::Synced);

        let err = client.track(&path, Track::default()).await.unwrap_err();
        assert!(matches!(err, SdkError::AlreadyTracked(_)));
    }

    #[tokio::test]
    async fn check_in_after_rollbacks_is_head_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bracket.sldprt");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 5).await;
        assert_eq!(file.head_version, v(5));

        client.rollback_or_roll_forward(&file.id, v(2)).await.unwrap();
        client.rollback_or_roll_forward(&file.id, v(4)).await.unwrap();
        client.rollback_or_roll_forward(&file.id, v(1)).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"rev 1");

        std::fs::write(&path, b"rev 1, patched").unwrap();
        let result = client.check_in(&file.id, CheckIn::new("patch")).await.unwrap();
        assert_eq!(result.record.version, v(6));
        assert_eq!(result.based_on, v(1));
        assert!(result.lock_released);

        let state = client.get_local_state(&file.id).await.unwrap();
        assert_eq!(state.pointer.unwrap().version, v(6));
        assert_eq!(state.local_hash(), Some(ContentHash::of(b"rev 1, patched")));
        assert!(client.verify_history(&file.id).await.unwrap().is_valid());
        assert!(client.locks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_user_cannot_roll_back_or_check_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("housing.sldasm");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 3).await;
        let bob_client = client.as_user(bob());

        let err = bob_client.checkout(&file.id).await.unwrap_err();
        assert!(matches!(err, SdkError::Sync(SyncError::AlreadyHeld { .. })));

        let err = bob_client
            .rollback_or_roll_forward(&file.id, v(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Sync(SyncError::NotCheckedOut { holder: Some(ref h), .. }) if *h == alice()
        ));

        let err = bob_client.check_in(&file.id, CheckIn::new("x")).await.unwrap_err();
        assert!(matches!(err, SdkError::Sync(SyncError::NotCheckedOut { .. })));
        let err = bob_client.release(&file.id).await.unwrap_err();
        assert!(matches!(err, SdkError::Sync(SyncError::NotCheckedOut { .. })));

        assert_eq!(std::fs::read(&path).unwrap(), b"rev 3");
        assert_eq!(client.tracked_file(&file.id).await.unwrap().head_version, v(3));
    }

    #[tokio::test]
    async fn lock_moves_between_users() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plate.dxf");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 2).await;
        let bob_client = client.as_user(bob());

        client.release(&file.id).await.unwrap();
        assert!(client.tracked_file(&file.id).await.unwrap().checked_out_by.is_none());

        bob_client.checkout(&file.id).await.unwrap();
        let tracked = client.tracked_file(&file.id).await.unwrap();
        assert_eq!(tracked.checked_out_by, Some(bob()));
        bob_client.rollback_or_roll_forward(&file.id, v(1)).await.unwrap();
    }

    #[tokio::test]
    async fn metadata_requires_lock_but_lifecycle_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shaft.ipt");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 1).await;
        let bob_client = client.as_user(bob());

        let updated = bob_client
            .set_lifecycle_state(&file.id, LifecycleState::InReview)
            .await
            .unwrap();
        assert_eq!(updated.lifecycle_state, LifecycleState::InReview);

        let metadata = FileMetadata {
            title: Some("Drive shaft".into()),
            ..FileMetadata::default()
        };
        let err = bob_client
            .update_metadata(&file.id, metadata.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Sync(SyncError::NotCheckedOut { .. })));

        let updated = client.update_metadata(&file.id, metadata).await.unwrap();
        assert_eq!(updated.metadata.title.as_deref(), Some("Drive shaft"));
    }

    #[tokio::test]
    async fn status_reports_rolled_back_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bracket.sldprt");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 3).await;
        client.rollback_or_roll_forward(&file.id, v(2)).await.unwrap();

        let rows = client.status().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].active_version, v(2));
        assert!(rows[0].is_behind_head());
        assert_eq!(rows[0].diff_status, DiffStatus::Synced);
        assert_eq!(rows[0].lock.as_ref().map(|l| l.holder.clone()), Some(alice()));
    }

    #[tokio::test]
    async fn workspace_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = ClientConfig {
            user: Some("alice".into()),
            ..ClientConfig::default()
        };
        let client = PdmClient::init(root, &config).unwrap();
        assert!(matches!(
            PdmClient::init(root, &config),
            Err(SdkError::AlreadyInitialized(_))
        ));

        let path = root.join("models").join("bracket.sldprt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = tracked_with_versions(&client, &path, 3).await;
        assert_eq!(file.relative_path, "models/bracket.sldprt");
        client.rollback_or_roll_forward(&file.id, v(1)).await.unwrap();
        client.flush_activity().await;
        drop(client);

        let reopened = PdmClient::open(root).unwrap();
        let tracked = reopened.resolve("models/bracket.sldprt").await.unwrap();
        assert_eq!(tracked.id, file.id);
        assert_eq!(tracked.head_version, v(3));
        let state = reopened.get_local_state(&file.id).await.unwrap();
        assert_eq!(state.pointer.unwrap().version, v(1));
        assert_eq!(reopened.locks().await.unwrap().len(), 1);
        reopened.rollback_or_roll_forward(&file.id, v(3)).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"rev 3");
        reopened.flush_activity().await;

        let activity = JsonlActivityLog::new(root.join(".pdm").join("activity.jsonl"))
            .read_all()
            .unwrap();
        let kinds: Vec<ActivityKind> = activity.iter().map(|e| e.kind).collect();
        assert_eq!(kinds.first(), Some(&ActivityKind::CheckIn));
        assert_eq!(kinds.last(), Some(&ActivityKind::RollForward));
        assert!(kinds.contains(&ActivityKind::Rollback));
    }

    #[tokio::test]
    async fn open_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PdmClient::open(dir.path()),
            Err(SdkError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn resolve_by_id_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.sldprt");
        std::fs::write(&path, b"cover").unwrap();
        let client = PdmClient::in_memory(alice());
        let file = client.track(&path, Track::default()).await.unwrap();

        let by_id = client.resolve(&file.id.to_string()).await.unwrap();
        assert_eq!(by_id.id, file.id);
        let prefix = &file.id.to_string()[..8];
        assert_eq!(client.resolve(prefix).await.unwrap().id, file.id);
        assert!(matches!(
            client.resolve("nothing-here").await,
            Err(SdkError::NotTracked(_))
        ));
    }

    #[tokio::test]
    async fn refresh_detects_local_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gear.ipt");
        let client = PdmClient::in_memory(alice());
        let file = tracked_with_versions(&client, &path, 2).await;

        std::fs::write(&path, b"unsaved tweak").unwrap();
        let states = client.refresh_all().await.unwrap();
        assert_eq!(states[0].diff_status, DiffStatus::Modified);
        assert_eq!(client.diff_status(&file.id).await.unwrap(), DiffStatus::Modified);
    }

    #[tokio::test]
    async fn failed_release_after_check_in_still_reports_the_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flange.sldprt");
        let client = PdmClient::from_backends(
            alice(),
            None,
            Backends {
                log: Arc::new(InMemoryVersionLog::new()),
                store: Arc::new(InMemoryContentStore::new()),
                locks: Arc::new(ReleaseUnavailable(InMemoryLockManager::new())),
                io: Arc::new(FsFileIo::new()),
                local: Arc::new(InMemoryWorkingStateStore::new()),
                activity: Arc::new(NullActivitySink),
            },
        );
        let file = tracked_with_versions(&client, &path, 2).await;

        std::fs::write(&path, b"rev 3").unwrap();
        let result = client.check_in(&file.id, CheckIn::new("rev 3")).await.unwrap();
        assert_eq!(result.record.version, v(3));
        assert!(!result.lock_released);

        let tracked = client.tracked_file(&file.id).await.unwrap();
        assert_eq!(tracked.head_version, v(3));
        assert_eq!(tracked.checked_out_by, Some(alice()));
        assert_eq!(client.locks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_all_skips_busy_files() {
        let dir = tempfile::tempdir().unwrap();
        let client = PdmClient::in_memory(alice());
        let busy = tracked_with_versions(&client, &dir.path().join("busy.ipt"), 2).await;
        let idle = tracked_with_versions(&client, &dir.path().join("idle.ipt"), 1).await;

        std::fs::write(dir.path().join("idle.ipt"), b"local edit").unwrap();
        let _guard = client.engine().claim(&busy.id).unwrap();
        let states = client.refresh_all().await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].file_id, idle.id);
        assert_eq!(states[0].diff_status, DiffStatus::Modified);
    }
}
