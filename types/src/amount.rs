//! Token quantity type.
//!
//! Quantities are represented as fixed-point integers (u128) in the ledger's
//! base unit to avoid floating-point drift when penalties are summed and
//! subtracted. One display unit is 10^6 base units. On the wire (page payloads,
//! request records, configuration) quantities travel as plain numbers in
//! display units, which is what the ledger's own tooling writes.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use crate::TypeError;

/// Number of decimal places between base units and display units.
pub const DECIMALS: u32 = 6;

/// Base units per display unit.
pub const UNIT: u128 = 10u128.pow(DECIMALS);

/// A non-negative token amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u128);

impl Quantity {
    pub const ZERO: Self = Self(0);

    /// Create from raw base units.
    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from a whole number of display units.
    pub fn from_units(units: u64) -> Self {
        Self(units as u128 * UNIT)
    }

    /// Create from a display-unit number, rounding to the nearest base unit.
    pub fn from_display(value: f64) -> Result<Self, TypeError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TypeError::InvalidQuantity(value.to_string()));
        }
        Ok(Self((value * UNIT as f64).round() as u128))
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Value in display units.
    pub fn to_display(&self) -> f64 {
        self.0 as f64 / UNIT as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract, flooring at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:06}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Quantity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| TypeError::InvalidQuantity(s.to_string()))?;
        Self::from_display(value)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_display())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

/// Accepts numbers and numeric strings; request records written by hand
/// frequently carry `"penalty": "250"`.
struct QuantityVisitor;

impl Visitor<'_> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative number of display units")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        Ok(Quantity::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        u64::try_from(v)
            .map(Quantity::from_units)
            .map_err(|_| E::custom(TypeError::InvalidQuantity(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
        Quantity::from_display(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_fraction() {
        assert_eq!(Quantity::from_units(15000).to_string(), "15000");
        assert_eq!(Quantity::from_raw(9_000_500_000).to_string(), "9000.5");
        assert_eq!(Quantity::from_raw(1).to_string(), "0.000001");
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let balance = Quantity::from_units(100);
        let penalty = Quantity::from_units(250);
        assert_eq!(balance.saturating_sub(penalty), Quantity::ZERO);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(Quantity::from_display(-1.0).is_err());
        assert!(Quantity::from_display(f64::NAN).is_err());
        assert!(Quantity::from_display(f64::INFINITY).is_err());
        assert!("-5".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let q: Quantity = serde_json::from_str("15000").unwrap();
        assert_eq!(q, Quantity::from_units(15000));
        let q: Quantity = serde_json::from_str("6000.25").unwrap();
        assert_eq!(q.raw(), 6_000_250_000);
        let q: Quantity = serde_json::from_str("\"250\"").unwrap();
        assert_eq!(q, Quantity::from_units(250));
        assert!(serde_json::from_str::<Quantity>("-3").is_err());
        assert!(serde_json::from_str::<Quantity>("null").is_err());
    }

    #[test]
    fn serializes_as_display_number() {
        let json = serde_json::to_string(&Quantity::from_units(9000)).unwrap();
        assert_eq!(json, "9000.0");
    }

    #[test]
    fn sum_of_penalties() {
        let total: Quantity = [1000u64, 2000, 3000]
            .into_iter()
            .map(Quantity::from_units)
            .sum();
        assert_eq!(total, Quantity::from_units(6000));
    }
}
