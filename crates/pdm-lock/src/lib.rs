//! Checkout lock management for the PDM sync engine.
//!
//! A checkout lock grants one user exclusive write access to one tracked
//! file. Only the holder may check in, roll the working copy back or
//! forward, or edit tracked metadata. Lifecycle-state changes are exempt.
//!
//! The [`LockManager`] is the single authority: callers never infer lock
//! state from local data and never race around it. Locks are not
//! transferable; a lock is released, then re-acquired by someone else.
//!
//! # Modules
//!
//! - [`error`] -- Transport and persistence errors
//! - [`types`] -- [`AcquireOutcome`] and [`ReleaseOutcome`]
//! - [`traits`] -- The [`LockManager`] trait
//! - [`memory`] -- [`InMemoryLockManager`], optionally mirrored to JSON

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{LockError, LockResult};
pub use memory::InMemoryLockManager;
pub use traits::LockManager;
pub use types::{AcquireOutcome, ReleaseOutcome};
