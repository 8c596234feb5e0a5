//! Foundation types for the PDM version & checkout synchronization engine.
//!
//! Every other `pdm-*` crate depends on `pdm-types`. The types here are plain
//! data: they carry no storage or transport behavior of their own.
//!
//! # Key Types
//!
//! - [`FileId`] -- Stable identity of a PDM-managed file (UUID v7)
//! - [`UserId`] -- Identity of the acting user, as supplied by the permission system
//! - [`ContentHash`] -- Content-addressed identifier (BLAKE3 of the raw bytes)
//! - [`VersionNumber`] -- 1-based, gap-free version counter per file
//! - [`LifecycleState`] -- Workflow state (work-in-progress, in-review, ...)
//! - [`TrackedFile`] -- Catalog entry with the authoritative head pointers
//! - [`VersionRecord`] -- Immutable record of one committed revision
//! - [`CheckoutLock`] -- Exclusive write lock held by a single user

pub mod error;
pub mod file;
pub mod hash;
pub mod ids;
pub mod lifecycle;
pub mod lock;
pub mod record;
pub mod snapshot;
pub mod version;

pub use error::TypeError;
pub use file::{FileMetadata, TrackedFile};
pub use hash::ContentHash;
pub use ids::{FileId, UserId};
pub use lifecycle::LifecycleState;
pub use lock::CheckoutLock;
pub use record::VersionRecord;
pub use version::VersionNumber;
