//! Append-only version log for the PDM sync engine.
//!
//! The version log is the sole source of truth for which versions of a file
//! exist. It provides:
//! - `VersionLog` / `VersionLogWriter` trait boundaries (read side used by the
//!   rollback engine, write side used by the check-in workflow)
//! - the tracked-file catalog, whose head pointers advance in the same
//!   critical section as an append
//! - `InMemoryVersionLog`, optionally mirrored to a JSON snapshot file
//! - `HistoryValidator` for the ordering invariant (contiguous, 1-based,
//!   no duplicates)

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::{LogError, LogResult};
pub use memory::InMemoryVersionLog;
pub use traits::{VersionLog, VersionLogWriter};
pub use types::{NewFile, NewVersion};
pub use validation::{HistoryValidator, ValidationReport, Violation, ViolationKind};
