//! The [`LockManager`] trait defining the lock authority interface.

use async_trait::async_trait;
use pdm_types::{CheckoutLock, FileId, UserId};

use crate::error::LockResult;
use crate::types::{AcquireOutcome, ReleaseOutcome};

/// Authority over checkout locks.
///
/// Implementations must perform check-and-set atomically: two concurrent
/// `try_acquire` calls for the same file can never both return `Acquired`
/// for different users.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn try_acquire(&self, file: &FileId, user: &UserId) -> LockResult<AcquireOutcome>;

    async fn release(&self, file: &FileId, user: &UserId) -> LockResult<ReleaseOutcome>;

    /// The current lock on `file`, if any.
    async fn holder(&self, file: &FileId) -> LockResult<Option<CheckoutLock>>;

    /// All active locks, ordered by file id.
    async fn list_locks(&self) -> LockResult<Vec<CheckoutLock>>;

    /// Returns `true` if `user` currently holds the lock on `file`.
    async fn is_holder(&self, file: &FileId, user: &UserId) -> LockResult<bool> {
        Ok(self
            .holder(file)
            .await?
            .is_some_and(|lock| lock.is_held_by(user)))
    }
}
