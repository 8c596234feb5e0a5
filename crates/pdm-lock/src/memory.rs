//! In-memory lock manager for testing, embedding, and single-machine use.
//!
//! [`InMemoryLockManager`] keeps the lock table in a `BTreeMap` behind a
//! `Mutex`, so check-and-set is a single critical section. When opened with
//! a snapshot path the table is persisted before each change is published.
//!
//! A snapshot may be shared by several managers, in one process or many.
//! Every operation then takes an exclusive OS lock on a `<snapshot>.lock`
//! sidecar and reloads the table from disk before reading or changing it.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use fs2::FileExt;
use pdm_types::{snapshot, CheckoutLock, FileId, UserId};
use tracing::{debug, info};

use crate::error::{LockError, LockResult};
use crate::traits::LockManager;
use crate::types::{AcquireOutcome, ReleaseOutcome};

/// An in-memory implementation of [`LockManager`].
#[derive(Debug)]
pub struct InMemoryLockManager {
    locks: Mutex<BTreeMap<FileId, CheckoutLock>>,
    snapshot_path: Option<PathBuf>,
    offline: AtomicBool,
}

impl InMemoryLockManager {
    /// Create a new empty lock table.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(BTreeMap::new()),
            snapshot_path: None,
            offline: AtomicBool::new(false),
        }
    }

    /// Open a lock table mirrored to the JSON snapshot at `path`.
    pub fn open(path: impl Into<PathBuf>) -> LockResult<Self> {
        let path = path.into();
        let stored: Vec<CheckoutLock> = snapshot::load(&path)?.unwrap_or_default();
        debug!(path = %path.display(), locks = stored.len(), "opened lock table");
        Ok(Self {
            locks: Mutex::new(stored.into_iter().map(|l| (l.file_id, l)).collect()),
            snapshot_path: Some(path),
            offline: AtomicBool::new(false),
        })
    }

    /// Simulate loss (or recovery) of the lock authority.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> LockResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LockError::Unavailable("lock manager is offline".into()));
        }
        Ok(())
    }

    /// Take the cross-process guard and reload the table from the snapshot.
    ///
    /// The returned file holds the OS lock until it is dropped. Managers
    /// without a snapshot have nothing to share and get `None`.
    fn sync_from_disk(
        &self,
        table: &mut BTreeMap<FileId, CheckoutLock>,
    ) -> LockResult<Option<File>> {
        let Some(path) = &self.snapshot_path else {
            return Ok(None);
        };
        let guard = lock_sidecar(path)?;
        let stored: Vec<CheckoutLock> = snapshot::load(path)?.unwrap_or_default();
        *table = stored.into_iter().map(|l| (l.file_id, l)).collect();
        Ok(Some(guard))
    }

    fn persist(&self, table: &BTreeMap<FileId, CheckoutLock>) -> LockResult<()> {
        if let Some(path) = &self.snapshot_path {
            let locks: Vec<&CheckoutLock> = table.values().collect();
            snapshot::save(path, &locks)?;
        }
        Ok(())
    }
}

fn lock_sidecar(snapshot_path: &Path) -> LockResult<File> {
    let mut name = snapshot_path.as_os_str().to_owned();
    name.push(".lock");
    let path = PathBuf::from(name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)?;
    file.lock_exclusive()?;
    Ok(file)
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn try_acquire(&self, file: &FileId, user: &UserId) -> LockResult<AcquireOutcome> {
        self.ensure_online()?;
        let mut table = self.locks.lock().expect("lock poisoned");
        let _guard = self.sync_from_disk(&mut table)?;

        if let Some(existing) = table.get(file) {
            if existing.is_held_by(user) {
                return Ok(AcquireOutcome::Acquired(existing.clone()));
            }
            debug!(file = %file, holder = %existing.holder, requester = %user, "lock already held");
            return Ok(AcquireOutcome::AlreadyHeld {
                holder: existing.holder.clone(),
            });
        }

        let lock = CheckoutLock::new(*file, user.clone());
        let mut next = table.clone();
        next.insert(*file, lock.clone());
        self.persist(&next)?;
        *table = next;

        info!(file = %file, holder = %user, "checkout lock acquired");
        Ok(AcquireOutcome::Acquired(lock))
    }

    async fn release(&self, file: &FileId, user: &UserId) -> LockResult<ReleaseOutcome> {
        self.ensure_online()?;
        let mut table = self.locks.lock().expect("lock poisoned");
        let _guard = self.sync_from_disk(&mut table)?;

        match table.get(file) {
            Some(existing) if existing.is_held_by(user) => {}
            other => {
                return Ok(ReleaseOutcome::NotHolder {
                    holder: other.map(|l| l.holder.clone()),
                });
            }
        }

        let mut next = table.clone();
        next.remove(file);
        self.persist(&next)?;
        *table = next;

        info!(file = %file, holder = %user, "checkout lock released");
        Ok(ReleaseOutcome::Released)
    }

    async fn holder(&self, file: &FileId) -> LockResult<Option<CheckoutLock>> {
        self.ensure_online()?;
        let mut table = self.locks.lock().expect("lock poisoned");
        let _guard = self.sync_from_disk(&mut table)?;
        Ok(table.get(file).cloned())
    }

    async fn list_locks(&self) -> LockResult<Vec<CheckoutLock>> {
        self.ensure_online()?;
        let mut table = self.locks.lock().expect("lock poisoned");
        let _guard = self.sync_from_disk(&mut table)?;
        Ok(table.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[tokio::test]
    async fn acquire_free_lock() {
        let locks = InMemoryLockManager::new();
        let file = FileId::new();
        let outcome = locks.try_acquire(&file, &user("alice")).await.unwrap();
        assert!(outcome.is_acquired());
        assert!(locks.is_holder(&file, &user("alice")).await.unwrap());
    }

    #[tokio::test]
    async fn second_user_sees_already_held() {
        let locks = InMemoryLockManager::new();
        let file = FileId::new();
        locks.try_acquire(&file, &user("alice")).await.unwrap();
        let outcome = locks.try_acquire(&file, &user("bob")).await.unwrap();
        assert_eq!(outcome, AcquireOutcome::AlreadyHeld { holder: user("alice") });
        assert!(!locks.is_holder(&file, &user("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn reacquire_by_holder_is_idempotent() {
        let locks = InMemoryLockManager::new();
        let file = FileId::new();
        let first = locks.try_acquire(&file, &user("alice")).await.unwrap();
        let second = locks.try_acquire(&file, &user("alice")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(locks.list_locks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_holder_may_release() {
        let locks = InMemoryLockManager::new();
        let file = FileId::new();
        locks.try_acquire(&file, &user("alice")).await.unwrap();

        let outcome = locks.release(&file, &user("bob")).await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::NotHolder { holder: Some(user("alice")) });

        assert!(locks.release(&file, &user("alice")).await.unwrap().is_released());
        assert!(locks.holder(&file).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn release_of_free_lock_names_no_holder() {
        let locks = InMemoryLockManager::new();
        let outcome = locks.release(&FileId::new(), &user("alice")).await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::NotHolder { holder: None });
    }

    #[tokio::test]
    async fn lock_moves_only_through_release() {
        let locks = InMemoryLockManager::new();
        let file = FileId::new();
        locks.try_acquire(&file, &user("alice")).await.unwrap();
        locks.release(&file, &user("alice")).await.unwrap();
        let outcome = locks.try_acquire(&file, &user("bob")).await.unwrap();
        assert!(outcome.is_acquired());
        assert!(locks.is_holder(&file, &user("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_acquires_have_single_winner() {
        let locks = Arc::new(InMemoryLockManager::new());
        let file = FileId::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let locks = Arc::clone(&locks);
            handles.push(tokio::spawn(async move {
                locks.try_acquire(&file, &user(&format!("user-{i}"))).await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_acquired() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn offline_manager_is_unavailable() {
        let locks = InMemoryLockManager::new();
        locks.set_offline(true);
        let err = locks.try_acquire(&FileId::new(), &user("alice")).await.unwrap_err();
        assert!(matches!(err, LockError::Unavailable(_)));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.json");
        let file = FileId::new();
        {
            let locks = InMemoryLockManager::open(&path).unwrap();
            locks.try_acquire(&file, &user("alice")).await.unwrap();
        }
        let reopened = InMemoryLockManager::open(&path).unwrap();
        assert!(reopened.is_holder(&file, &user("alice")).await.unwrap());
    }

    #[tokio::test]
    async fn handles_on_one_snapshot_share_a_single_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.json");
        let first = InMemoryLockManager::open(&path).unwrap();
        let second = InMemoryLockManager::open(&path).unwrap();
        let file = FileId::new();

        assert!(first.try_acquire(&file, &user("alice")).await.unwrap().is_acquired());
        let outcome = second.try_acquire(&file, &user("bob")).await.unwrap();
        assert_eq!(outcome, AcquireOutcome::AlreadyHeld { holder: user("alice") });
        assert!(second.is_holder(&file, &user("alice")).await.unwrap());
        assert_eq!(second.list_locks().await.unwrap().len(), 1);

        assert!(first.release(&file, &user("alice")).await.unwrap().is_released());
        assert!(second.holder(&file).await.unwrap().is_none());
        assert!(second.try_acquire(&file, &user("bob")).await.unwrap().is_acquired());
        assert!(first.is_holder(&file, &user("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn handles_racing_on_one_snapshot_have_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.json");
        let file = FileId::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let locks = InMemoryLockManager::open(&path).unwrap();
            handles.push(tokio::task::spawn_blocking(move || {
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                runtime.block_on(locks.try_acquire(&file, &user(&format!("user-{i}")))).unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_acquired() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        let reopened = InMemoryLockManager::open(&path).unwrap();
        assert_eq!(reopened.list_locks().await.unwrap().len(), 1);
    }
}
