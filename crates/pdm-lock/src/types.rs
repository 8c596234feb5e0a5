use pdm_types::{CheckoutLock, UserId};
use serde::{Deserialize, Serialize};

/// Result of an acquisition attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquireOutcome {
    /// The caller now holds the lock. Re-acquiring a lock the caller already
    /// holds returns the existing lock unchanged.
    Acquired(CheckoutLock),
    /// Another user holds the lock.
    AlreadyHeld { holder: UserId },
}

impl AcquireOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired(_))
    }
}

/// Result of a release attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    Released,
    /// The caller does not hold the lock; `holder` names who does, if anyone.
    NotHolder { holder: Option<UserId> },
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}
