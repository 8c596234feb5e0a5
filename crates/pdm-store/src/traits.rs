use async_trait::async_trait;
use pdm_types::ContentHash;

use crate::error::StoreResult;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written; the same bytes always produce the
///   same hash.
/// - `fetch` returns exactly the bytes that were stored, verified against
///   their hash, or an error. It never returns partial content.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the bytes stored under `hash`.
    ///
    /// Returns `StoreError::NotFound` if no such blob exists and
    /// `StoreError::Unavailable` on transport failure.
    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Store `data` and return its hash. Storing existing content is a no-op.
    async fn put(&self, data: &[u8]) -> StoreResult<ContentHash>;

    /// Check whether a blob exists.
    async fn contains(&self, hash: &ContentHash) -> StoreResult<bool>;
}
