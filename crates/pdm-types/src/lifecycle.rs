use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Workflow state of a tracked file.
///
/// State is a shared workflow signal, not content: changing it does not
/// require the checkout lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    #[default]
    WorkInProgress,
    InReview,
    Released,
    Obsolete,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkInProgress => "work-in-progress",
            Self::InReview => "in-review",
            Self::Released => "released",
            Self::Obsolete => "obsolete",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "work-in-progress" | "wip" => Ok(Self::WorkInProgress),
            "in-review" | "review" => Ok(Self::InReview),
            "released" => Ok(Self::Released),
            "obsolete" => Ok(Self::Obsolete),
            _ => Err(TypeError::UnknownLifecycleState(s.to_string())),
        }
    }
}
