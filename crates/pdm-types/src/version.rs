use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Per-file version counter.
///
/// Version numbers start at 1 and increase by exactly one per check-in; a
/// file's history never has gaps or duplicates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VersionNumber(u32);

impl VersionNumber {
    /// The first version of every file.
    pub const FIRST: Self = Self(1);

    /// Build a version number, rejecting zero.
    pub fn new(n: u32) -> Result<Self, TypeError> {
        if n == 0 {
            return Err(TypeError::InvalidVersion("versions start at 1".into()));
        }
        Ok(Self(n))
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// The version a check-in on top of `self` receives.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl TryFrom<u32> for VersionNumber {
    type Error = TypeError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<VersionNumber> for u32 {
    fn from(version: VersionNumber) -> Self {
        version.0
    }
}

/// Accepts both `3` and `v3`.
impl FromStr for VersionNumber {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('v').unwrap_or(s);
        let n = digits
            .parse::<u32>()
            .map_err(|e| TypeError::InvalidVersion(format!("{s}: {e}")))?;
        Self::new(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_rejected() {
        assert!(VersionNumber::new(0).is_err());
    }

    #[test]
    fn next_increments_by_one() {
        assert_eq!(VersionNumber::FIRST.next().get(), 2);
    }

    #[test]
    fn parse_with_and_without_prefix() {
        assert_eq!("3".parse::<VersionNumber>().unwrap().get(), 3);
        assert_eq!("v12".parse::<VersionNumber>().unwrap().get(), 12);
        assert!("v0".parse::<VersionNumber>().is_err());
        assert!("three".parse::<VersionNumber>().is_err());
    }

    #[test]
    fn display_uses_v_prefix() {
        assert_eq!(VersionNumber::new(5).unwrap().to_string(), "v5");
    }

    #[test]
    fn serde_is_a_bare_number() {
        let version = VersionNumber::new(7).unwrap();
        assert_eq!(serde_json::to_string(&version).unwrap(), "7");
        assert_eq!(serde_json::from_str::<VersionNumber>("7").unwrap(), version);
    }

    #[test]
    fn zero_is_rejected_when_deserializing() {
        assert!(serde_json::from_str::<VersionNumber>("0").is_err());
    }

    proptest! {
        #[test]
        fn next_is_strictly_greater(n in 1u32..u32::MAX) {
            let version = VersionNumber::new(n).unwrap();
            prop_assert!(version.next() > version);
            prop_assert_eq!(version.next().get(), n + 1);
        }

        #[test]
        fn display_parses_back(n in 1u32..=u32::MAX) {
            let version = VersionNumber::new(n).unwrap();
            prop_assert_eq!(version.to_string().parse::<VersionNumber>().unwrap(), version);
            prop_assert_eq!(n.to_string().parse::<VersionNumber>().unwrap(), version);
        }
    }
}
