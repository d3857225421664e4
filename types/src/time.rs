//! Timestamp type and the clock abstraction.
//!
//! Timestamps are UTC instants with millisecond precision or better. On the
//! wire they are RFC 3339 strings with a `Z` suffix, the format the ledger's
//! records already use for `verified`, `created` and `updated` fields.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// A UTC instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current system time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Result<Self, TypeError> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self)
            .ok_or_else(|| TypeError::InvalidTimestamp(millis.to_string()))
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// RFC 3339 with microseconds and a `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        // Offset-less ISO strings are taken as UTC.
        NaiveDateTime::from_str(s)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|_| TypeError::InvalidTimestamp(s.to_string()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of the current time.
///
/// Production code uses [`SystemClock`]; tests swap in a deterministic clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_has_z_suffix() {
        let ts = Timestamp::from_millis(1_700_000_000_123).unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-11-14T22:13:20.123000Z");
    }

    #[test]
    fn parses_python_isoformat() {
        let ts: Timestamp = "2024-03-01T12:00:00.654321Z".parse().unwrap();
        assert_eq!(ts.as_millis(), 1_709_294_400_654);
        let naive: Timestamp = "2024-03-01T12:00:00".parse().unwrap();
        assert_eq!(naive.as_millis(), 1_709_294_400_000);
    }

    #[test]
    fn serde_round_trip_keeps_millis() {
        let ts = Timestamp::from_millis(1_700_000_000_123).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("yesterday".parse::<Timestamp>().is_err());
    }
}
