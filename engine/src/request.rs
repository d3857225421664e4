//! Request records created by users in the ledger.
//!
//! A request is an asset whose type field is `verification-request` or
//! `dispute-request`. The engine only touches requests whose `status` is
//! `pending`, and moves them to a terminal status.

use dist_store::Record;
use dist_types::{Namespace, Quantity, Tier, TypeError};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Verification,
    Dispute,
}

impl RequestKind {
    /// Type tag the request records carry.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Verification => "verification-request",
            Self::Dispute => "dispute-request",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Registered,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Registered => "registered",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for RequestStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "registered" => Self::Registered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request record could not be turned into a [`Request`].
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("request has no address or name")]
    MissingId,

    #[error("request has no namespace")]
    MissingNamespace,

    #[error("invalid namespace: {0}")]
    InvalidNamespace(#[from] TypeError),

    #[error("unknown tier {0}")]
    UnknownTier(String),

    #[error("tier {0} cannot be requested")]
    UnverifiedTier(Tier),

    #[error("invalid penalty {0}")]
    InvalidPenalty(String),
}

/// What the request asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Verification { tier: Tier },
    Dispute { penalty: Quantity, reason: String },
}

/// A parsed pending request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// Ledger name or address of the request record; status updates go here.
    pub id: String,
    pub namespace: Namespace,
    pub body: RequestBody,
}

impl Request {
    /// Parse a request record of the given kind.
    ///
    /// A verification request without a `tier` asks for `L1`. A dispute
    /// without a `penalty` carries a zero penalty.
    pub fn from_record(kind: RequestKind, record: &Record) -> Result<Self, RequestError> {
        let id = request_id(record).ok_or(RequestError::MissingId)?;
        let namespace = match record.get_str("namespace") {
            Some(raw) => Namespace::new(raw)?,
            None => return Err(RequestError::MissingNamespace),
        };
        let body = match kind {
            RequestKind::Verification => RequestBody::Verification {
                tier: parse_tier(record.get("tier"))?,
            },
            RequestKind::Dispute => RequestBody::Dispute {
                penalty: parse_penalty(record.get("penalty"))?,
                reason: record.get_str("reason").unwrap_or_default().to_string(),
            },
        };
        Ok(Self { id, namespace, body })
    }

    pub fn kind(&self) -> RequestKind {
        match self.body {
            RequestBody::Verification { .. } => RequestKind::Verification,
            RequestBody::Dispute { .. } => RequestKind::Dispute,
        }
    }
}

/// Id of a request record: its `address`, falling back to its `name`.
pub fn request_id(record: &Record) -> Option<String> {
    ["address", "name"]
        .into_iter()
        .filter_map(|field| record.get_str(field))
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

pub fn request_status(record: &Record) -> Option<RequestStatus> {
    record.get_str("status").map(RequestStatus::from)
}

pub fn is_pending(record: &Record) -> bool {
    request_status(record) == Some(RequestStatus::Pending)
}

fn parse_tier(value: Option<&Value>) -> Result<Tier, RequestError> {
    let tier = match value {
        None | Some(Value::Null) => Tier::L1,
        Some(Value::String(s)) => s
            .parse::<Tier>()
            .map_err(|_| RequestError::UnknownTier(s.clone()))?,
        Some(other) => return Err(RequestError::UnknownTier(other.to_string())),
    };
    if !tier.is_verified() {
        return Err(RequestError::UnverifiedTier(tier));
    }
    Ok(tier)
}

fn parse_penalty(value: Option<&Value>) -> Result<Quantity, RequestError> {
    match value {
        None | Some(Value::Null) => Ok(Quantity::ZERO),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| RequestError::InvalidPenalty(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification(fields: Record) -> Result<Request, RequestError> {
        Request::from_record(RequestKind::Verification, &fields)
    }

    #[test]
    fn verification_defaults_to_l1() {
        let req = verification(
            Record::new().with("name", "req-1").with("namespace", "alice"),
        )
        .unwrap();
        assert_eq!(req.id, "req-1");
        assert_eq!(req.body, RequestBody::Verification { tier: Tier::L1 });
        assert_eq!(req.kind(), RequestKind::Verification);
    }

    #[test]
    fn address_is_preferred_over_name() {
        let record = Record::new()
            .with("address", "8abc")
            .with("name", "req-1")
            .with("namespace", "alice");
        assert_eq!(request_id(&record).as_deref(), Some("8abc"));

        let blank_address = Record::new().with("address", "").with("name", "req-1");
        assert_eq!(request_id(&blank_address).as_deref(), Some("req-1"));
    }

    #[test]
    fn malformed_verification_requests() {
        assert_eq!(
            verification(Record::new().with("namespace", "alice")),
            Err(RequestError::MissingId)
        );
        assert_eq!(
            verification(Record::new().with("name", "r")),
            Err(RequestError::MissingNamespace)
        );
        assert!(matches!(
            verification(Record::new().with("name", "r").with("namespace", " ")),
            Err(RequestError::InvalidNamespace(_))
        ));
        assert_eq!(
            verification(Record::new().with("name", "r").with("namespace", "a").with("tier", "L9")),
            Err(RequestError::UnknownTier("L9".into()))
        );
        assert_eq!(
            verification(Record::new().with("name", "r").with("namespace", "a").with("tier", "L0")),
            Err(RequestError::UnverifiedTier(Tier::L0))
        );
        assert!(matches!(
            verification(Record::new().with("name", "r").with("namespace", "a").with("tier", 2)),
            Err(RequestError::UnknownTier(_))
        ));
    }

    #[test]
    fn dispute_penalty_parsing() {
        let parse = |penalty: Value| {
            Request::from_record(
                RequestKind::Dispute,
                &Record::new()
                    .with("name", "d-1")
                    .with("namespace", "alice")
                    .with("reason", "spam")
                    .with("penalty", penalty),
            )
        };
        assert_eq!(
            parse(Value::from(6000)).unwrap().body,
            RequestBody::Dispute {
                penalty: Quantity::from_units(6_000),
                reason: "spam".into()
            }
        );
        assert!(matches!(
            parse(Value::from("12.5")).unwrap().body,
            RequestBody::Dispute { penalty, .. } if penalty == Quantity::from_display(12.5).unwrap()
        ));
        assert!(matches!(parse(Value::from(-5)), Err(RequestError::InvalidPenalty(_))));
        assert!(matches!(parse(Value::from("lots")), Err(RequestError::InvalidPenalty(_))));
        assert!(matches!(
            parse(Value::Null).unwrap().body,
            RequestBody::Dispute { penalty, .. } if penalty.is_zero()
        ));
    }

    #[test]
    fn only_pending_records_are_pending() {
        assert!(is_pending(&Record::new().with("status", "pending")));
        assert!(!is_pending(&Record::new().with("status", "approved")));
        assert!(!is_pending(&Record::new()));
        assert_eq!(
            request_status(&Record::new().with("status", "on-hold")),
            Some(RequestStatus::Other("on-hold".into()))
        );
    }
}
