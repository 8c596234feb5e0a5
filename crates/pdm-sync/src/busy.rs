//! Per-file in-flight markers.
//!
//! At most one rollback, roll-forward or check-in runs per file at a time.
//! A claim returns a guard that releases the file when dropped, including on
//! early returns and panics.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use pdm_types::FileId;

#[derive(Clone, Debug, Default)]
pub struct BusySet {
    inner: Arc<Mutex<HashSet<FileId>>>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `file` busy, or return `None` if it already is.
    pub fn try_claim(&self, file: FileId) -> Option<BusyGuard> {
        let mut busy = self.inner.lock().expect("lock poisoned");
        if !busy.insert(file) {
            return None;
        }
        Some(BusyGuard {
            set: Arc::clone(&self.inner),
            file,
        })
    }

    pub fn is_busy(&self, file: &FileId) -> bool {
        self.inner.lock().expect("lock poisoned").contains(file)
    }
}

/// Clears the busy mark of one file on drop.
#[derive(Debug)]
pub struct BusyGuard {
    set: Arc<Mutex<HashSet<FileId>>>,
    file: FileId,
}

impl BusyGuard {
    pub fn file_id(&self) -> FileId {
        self.file
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        // Never panic in drop, even on a poisoned lock.
        let mut busy = match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        busy.remove(&self.file);
    }
}
