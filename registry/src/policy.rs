//! Tier policy: which tier an effective balance qualifies for.

use dist_types::{Quantity, Tier};
use serde::{Deserialize, Serialize};

use crate::PolicyError;

/// Minimum effective balance for each verified tier, in display units.
///
/// Keys match the ledger's config format (`L1`, `L2`, `L3`); other keys such
/// as a legacy `L0` entry are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    #[serde(rename = "L1")]
    pub l1: Quantity,
    #[serde(rename = "L2")]
    pub l2: Quantity,
    #[serde(rename = "L3")]
    pub l3: Quantity,
}

impl TierThresholds {
    pub fn new(l1: Quantity, l2: Quantity, l3: Quantity) -> Self {
        Self { l1, l2, l3 }
    }

    /// Threshold for a verified tier; `None` for `L0`.
    pub fn threshold(&self, tier: Tier) -> Option<Quantity> {
        match tier {
            Tier::L0 => None,
            Tier::L1 => Some(self.l1),
            Tier::L2 => Some(self.l2),
            Tier::L3 => Some(self.l3),
        }
    }

    /// Check that thresholds strictly increase with tier.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let ladder = [(Tier::L1, self.l1), (Tier::L2, self.l2), (Tier::L3, self.l3)];
        for pair in ladder.windows(2) {
            let (lower, lower_threshold) = pair[0];
            let (upper, upper_threshold) = pair[1];
            if lower_threshold >= upper_threshold {
                return Err(PolicyError::NotIncreasing {
                    lower,
                    lower_threshold,
                    upper,
                    upper_threshold,
                });
            }
        }
        Ok(())
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            l1: Quantity::from_units(1_000),
            l2: Quantity::from_units(10_000),
            l3: Quantity::from_units(100_000),
        }
    }
}

/// Maps effective balances to tiers. Construction validates the thresholds,
/// so a `TierPolicy` in hand is always well-formed.
#[derive(Clone, Debug)]
pub struct TierPolicy {
    thresholds: TierThresholds,
}

impl TierPolicy {
    pub fn new(thresholds: TierThresholds) -> Result<Self, PolicyError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Highest tier whose threshold is at or below `effective_balance`, else `L0`.
    pub fn eligible_tier(&self, effective_balance: Quantity) -> Tier {
        Tier::VERIFIED_DESC
            .into_iter()
            .find(|tier| {
                self.thresholds
                    .threshold(*tier)
                    .is_some_and(|min| effective_balance >= min)
            })
            .unwrap_or(Tier::L0)
    }
}

/// Raw balance minus active penalties, floored at zero.
pub fn effective_balance(balance: Quantity, active_penalties: Quantity) -> Quantity {
    balance.saturating_sub(active_penalties)
}
