use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pdm_types::ContentHash;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. The store can be switched offline to
/// simulate transport loss: every call then fails with
/// [`StoreError::Unavailable`].
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
    offline: AtomicBool,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Simulate loss (or recovery) of the transport.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Store bytes under an arbitrary key without hashing them.
    ///
    /// Fault injection only: lets tests model a corrupted blob.
    pub fn insert_unchecked(&self, hash: ContentHash, data: Vec<u8>) {
        self.blobs.write().expect("lock poisoned").insert(hash, data);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        self.ensure_online()?;
        let data = self
            .blobs
            .read()
            .expect("lock poisoned")
            .get(hash)
            .cloned()
            .ok_or(StoreError::NotFound(*hash))?;
        let computed = ContentHash::of(&data);
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed,
            });
        }
        Ok(data)
    }

    async fn put(&self, data: &[u8]) -> StoreResult<ContentHash> {
        self.ensure_online()?;
        let hash = ContentHash::of(data);
        self.blobs
            .write()
            .expect("lock poisoned")
            .entry(hash)
            .or_insert_with(|| data.to_vec());
        Ok(hash)
    }

    async fn contains(&self, hash: &ContentHash) -> StoreResult<bool> {
        self.ensure_online()?;
        Ok(self.blobs.read().expect("lock poisoned").contains_key(hash))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &self.len())
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_fetch() {
        let store = InMemoryContentStore::new();
        let hash = store.put(b"bracket rev A").await.unwrap();
        assert_eq!(hash, ContentHash::of(b"bracket rev A"));
        assert_eq!(store.fetch(&hash).await.unwrap(), b"bracket rev A");
    }

    #[tokio::test]
    async fn identical_content_is_deduplicated() {
        let store = InMemoryContentStore::new();
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 4);
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let store = InMemoryContentStore::new();
        let hash = ContentHash::of(b"never stored");
        let err = store.fetch(&hash).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(h) if h == hash));
        assert!(!store.contains(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = InMemoryContentStore::new();
        let hash = store.put(b"data").await.unwrap();
        store.set_offline(true);
        let err = store.fetch(&hash).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.is_transient());

        store.set_offline(false);
        assert_eq!(store.fetch(&hash).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn corrupted_blob_is_detected() {
        let store = InMemoryContentStore::new();
        let hash = ContentHash::of(b"expected");
        store.insert_unchecked(hash, b"bit-rotted".to_vec());
        let err = store.fetch(&hash).await.unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { expected, .. } if expected == hash));
        assert!(!err.is_transient());
    }
}
