use proptest::prelude::*;

use dist_types::{Quantity, Tier, Timestamp};

fn any_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::L0), Just(Tier::L1), Just(Tier::L2), Just(Tier::L3)]
}

proptest! {
    /// Effective balance never goes negative and never exceeds the raw balance.
    #[test]
    fn saturating_sub_bounded(balance in 0u128..1u128 << 100, penalty in 0u128..1u128 << 100) {
        let b = Quantity::from_raw(balance);
        let p = Quantity::from_raw(penalty);
        let effective = b.saturating_sub(p);
        prop_assert!(effective <= b);
        prop_assert_eq!(effective.raw(), balance.saturating_sub(penalty));
    }

    /// Whole display units survive the JSON wire format exactly.
    #[test]
    fn whole_units_survive_json(units in 0u64..1_000_000_000) {
        let q = Quantity::from_units(units);
        let json = serde_json::to_string(&q).unwrap();
        let back: Quantity = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, q);
    }

    /// Tier ordering agrees with `order()`.
    #[test]
    fn tier_ordering_consistent(a in any_tier(), b in any_tier()) {
        prop_assert_eq!(a < b, a.order() < b.order());
        prop_assert_eq!(a == b, a.order() == b.order());
    }

    /// Millisecond timestamps survive the RFC 3339 wire format.
    #[test]
    fn timestamp_millis_survive_json(millis in 0i64..4_102_444_800_000) {
        let ts = Timestamp::from_millis(millis).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.as_millis(), millis);
    }
}
