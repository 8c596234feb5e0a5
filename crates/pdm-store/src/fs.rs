use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pdm_types::ContentHash;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Filesystem content store.
///
/// Blobs live under `root/<first two hex chars>/<remaining hex chars>`.
/// Writes go through a temporary file in `root/tmp` that is fsynced and
/// renamed into place, so a crash never leaves a truncated blob under its
/// final name.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("tmp"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn read_blob(path: PathBuf, hash: ContentHash) -> StoreResult<Vec<u8>> {
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(hash));
            }
            Err(e) => return Err(e.into()),
        };
        let computed = ContentHash::of(&data);
        if computed != hash {
            return Err(StoreError::HashMismatch {
                expected: hash,
                computed,
            });
        }
        Ok(data)
    }

    fn write_blob(root: PathBuf, dest: PathBuf, data: Vec<u8>) -> StoreResult<()> {
        if dest.exists() {
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = NamedTempFile::new_in(root.join("tmp"))?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let path = self.blob_path(hash);
        let hash = *hash;
        tokio::task::spawn_blocking(move || Self::read_blob(path, hash))
            .await
            .map_err(|e| StoreError::Unavailable(format!("blob read task failed: {e}")))?
    }

    async fn put(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let hash = ContentHash::of(data);
        let dest = self.blob_path(&hash);
        let root = self.root.clone();
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::write_blob(root, dest, data))
            .await
            .map_err(|e| StoreError::Unavailable(format!("blob write task failed: {e}")))??;
        debug!(hash = %hash.short_hex(), "stored blob");
        Ok(hash)
    }

    async fn contains(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(hash)).await?)
    }
}
