//! Version & checkout synchronization for PDM working copies.
//!
//! The [`SyncEngine`] moves a local working copy to any historical version
//! of a file (rollback or roll-forward) without ever appending to, editing,
//! or removing from the version log. Every operation is a strict sequence:
//! authorize, resolve, fetch, write, commit, audit. Local state is mutated
//! only at the commit step, as one atomic pointer-and-hash update.

pub mod activity;
pub mod busy;
pub mod engine;
pub mod error;
pub mod types;

pub use activity::{
    ActivityEvent, ActivityKind, ActivitySink, BroadcastActivityLog, JsonlActivityLog,
    ActivityStream, MemoryActivityLog, NullActivitySink,
};
pub use busy::{BusyGuard, BusySet};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use types::{Direction, RollOutcome, RollRequest};
