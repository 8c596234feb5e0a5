//! High-level client API for the PDM sync engine.
//!
//! [`PdmClient`] wires the version log, content store, lock manager, local
//! working state and the rollback engine together behind one facade acting
//! as a single user. It adds the workflows that append to history (tracking
//! and check-in) and the `.pdm/` workspace layout used by the CLI.
//!
//! ```no_run
//! # async fn demo() -> pdm_sdk::SdkResult<()> {
//! use pdm_sdk::{CheckIn, PdmClient};
//!
//! let client = PdmClient::open(std::path::Path::new("."))?;
//! let file = client.resolve("models/bracket.sldprt").await?;
//! client.checkout(&file.id).await?;
//! client.rollback_or_roll_forward(&file.id, "v3".parse()?).await?;
//! client.check_in(&file.id, CheckIn::new("restore hole pattern")).await?;
//! # Ok(())
//! # }
//! ```

pub mod checkin;
pub mod client;
pub mod config;
pub mod error;

pub use checkin::{CheckIn, CheckInResult, FileStatus, Track};
pub use client::{Backends, PdmClient};
pub use config::{ClientConfig, CONFIG_FILE, PDM_DIR};
pub use error::{SdkError, SdkResult};

pub use pdm_log::{ValidationReport, Violation, ViolationKind};
pub use pdm_sync::{ActivityEvent, ActivityKind, Direction, RollOutcome, SyncError};
pub use pdm_types::{
    CheckoutLock, ContentHash, FileId, FileMetadata, LifecycleState, TrackedFile, UserId,
    VersionNumber, VersionRecord,
};
pub use pdm_workdir::{DiffStatus, LocalWorkingState};
