//! Content-addressed blob storage for the PDM sync engine.
//!
//! Every committed version of a tracked file stores its complete bytes as an
//! immutable blob identified by the BLAKE3 hash of those bytes. There is no
//! binary diffing: two versions with identical content share one blob.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsContentStore`] -- fan-out directory of blob files (`ab/cdef...`)
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. Every fetch re-hashes the bytes before returning them.
//! 3. Concurrent reads are always safe.
//! 4. The store never interprets blob contents.
//! 5. Transport failures surface as [`StoreError::Unavailable`] and are never
//!    retried here; retry policy belongs to the caller.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsContentStore;
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
