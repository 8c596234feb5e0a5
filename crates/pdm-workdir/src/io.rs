//! Local file I/O adapter.
//!
//! Working copies are materialized with a scoped write-then-verify sequence:
//! the bytes go to a temporary file next to the target, are fsynced and read
//! back, checked against the expected length and hash, and only then renamed
//! over the target. The temporary file is owned by a `NamedTempFile`, which
//! deletes it on drop, so every early return leaves the target untouched and
//! no stray file behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pdm_types::ContentHash;
use tracing::debug;

use crate::error::{WorkdirError, WorkdirResult};

/// Reads and atomically writes working-copy files.
#[async_trait]
pub trait LocalFileIo: Send + Sync {
    /// Read the whole file. A missing file is `WorkdirError::FileMissing`.
    async fn read_bytes(&self, path: &Path) -> WorkdirResult<Vec<u8>>;

    /// Replace the file at `path` with `bytes`, verifying them against
    /// `expected` before the replacement becomes visible.
    async fn write_bytes_atomic(
        &self,
        path: &Path,
        bytes: &[u8],
        expected: &ContentHash,
    ) -> WorkdirResult<()>;
}

/// [`LocalFileIo`] over the operating-system filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsFileIo;

impl FsFileIo {
    pub fn new() -> Self {
        Self
    }

    fn write_verified(path: &Path, bytes: &[u8], expected: ContentHash) -> WorkdirResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".pdm-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        let written = fs::read(tmp.path())?;
        if written.len() != bytes.len() {
            return Err(WorkdirError::LengthMismatch {
                expected: bytes.len() as u64,
                actual: written.len() as u64,
            });
        }
        let computed = ContentHash::of(&written);
        if computed != expected {
            return Err(WorkdirError::VerifyFailed { expected, computed });
        }

        tmp.persist(path).map_err(|e| WorkdirError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl LocalFileIo for FsFileIo {
    async fn read_bytes(&self, path: &Path) -> WorkdirResult<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(WorkdirError::FileMissing(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_bytes_atomic(
        &self,
        path: &Path,
        bytes: &[u8],
        expected: &ContentHash,
    ) -> WorkdirResult<()> {
        let target: PathBuf = path.to_path_buf();
        let data = bytes.to_vec();
        let expected = *expected;
        tokio::task::spawn_blocking(move || Self::write_verified(&target, &data, expected))
            .await
            .map_err(|e| WorkdirError::Task(e.to_string()))??;
        debug!(path = %path.display(), bytes = bytes.len(), "materialized working copy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts").join("bracket.sldprt");
        let io = FsFileIo::new();
        io.write_bytes_atomic(&path, b"rev B", &ContentHash::of(b"rev B")).await.unwrap();
        assert_eq!(io.read_bytes(&path).await.unwrap(), b"rev B");
    }

    #[tokio::test]
    async fn write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawing.slddrw");
        fs::write(&path, b"old").unwrap();
        FsFileIo.write_bytes_atomic(&path, b"new", &ContentHash::of(b"new")).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(entries(dir.path()), vec!["drawing.slddrw".to_string()]);
    }

    #[tokio::test]
    async fn verification_failure_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawing.slddrw");
        fs::write(&path, b"original").unwrap();

        let err = FsFileIo
            .write_bytes_atomic(&path, b"incoming", &ContentHash::of(b"something else"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkdirError::VerifyFailed { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"original");
        assert_eq!(entries(dir.path()), vec!["drawing.slddrw".to_string()]);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsFileIo.read_bytes(&dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, WorkdirError::FileMissing(_)));
    }
}
