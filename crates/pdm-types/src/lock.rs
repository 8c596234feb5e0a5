use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FileId, UserId};

/// Exclusive write access to one tracked file.
///
/// A lock is never transferred: it is released and then re-acquired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLock {
    pub file_id: FileId,
    pub holder: UserId,
    pub acquired_at: DateTime<Utc>,
}

impl CheckoutLock {
    pub fn new(file_id: FileId, holder: UserId) -> Self {
        Self {
            file_id,
            holder,
            acquired_at: Utc::now(),
        }
    }

    pub fn is_held_by(&self, user: &UserId) -> bool {
        &self.holder == user
    }
}
