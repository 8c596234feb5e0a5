//! Client-resident working-copy state for the PDM sync engine.
//!
//! Tracks which version of each file is materialized on this machine and
//! whether the on-disk bytes still match it. This layer is an overlay on top
//! of the authoritative version log; the two are connected only through the
//! pure functions in [`reconcile`].
//!
//! # Key Types
//!
//! - [`LocalWorkingState`] -- per-file overlay (pointer + diff status)
//! - [`LocalPointer`] -- the active version and the hash of its bytes, always
//!   written together
//! - [`DiffStatus`] -- synced / modified / unknown
//! - [`WorkingStateStore`] -- keyed store; pointers change only via `commit`
//! - [`LocalFileIo`] / [`FsFileIo`] -- scoped write-then-verify file adapter

pub mod error;
pub mod io;
pub mod reconcile;
pub mod state;
pub mod store;

pub use error::{WorkdirError, WorkdirResult};
pub use io::{FsFileIo, LocalFileIo};
pub use reconcile::{Observation, Reconciler};
pub use state::{DiffStatus, LocalPointer, LocalWorkingState};
pub use store::{InMemoryWorkingStateStore, WorkingStateStore};
