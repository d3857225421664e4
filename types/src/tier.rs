//! Verification tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Ordinal verification level.
///
/// `L0` means "unverified": it is implicit and never stored in the registry.
/// Tiers are totally ordered, `L0 < L1 < L2 < L3`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    #[default]
    L0,
    L1,
    L2,
    L3,
}

impl Tier {
    /// Every tier that can hold registry entries, highest first.
    ///
    /// Lookups and audits walk tiers in this order.
    pub const VERIFIED_DESC: [Tier; 3] = [Tier::L3, Tier::L2, Tier::L1];

    /// Position in the total order (`L0` = 0).
    pub fn order(&self) -> u8 {
        match self {
            Self::L0 => 0,
            Self::L1 => 1,
            Self::L2 => 2,
            Self::L3 => 3,
        }
    }

    /// Whether this tier is stored in the registry (anything but `L0`).
    pub fn is_verified(&self) -> bool {
        !matches!(self, Self::L0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L0" => Ok(Self::L0),
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "L3" => Ok(Self::L3),
            other => Err(TypeError::UnknownTier(other.to_string())),
        }
    }
}
