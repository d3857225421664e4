//! Span constructors for engine operations.
//!
//! Consistent span names and fields let a cycle's log lines be filtered and
//! correlated, e.g. every line touching one request or one namespace.

use dist_types::{Namespace, Tier};
use tracing::{info_span, Span};

use crate::request::RequestKind;

/// Span covering one full processing cycle.
pub fn cycle_span(cycle: u64) -> Span {
    info_span!("cycle", cycle)
}

/// Span covering the intake of a single request record.
pub fn request_span(kind: RequestKind, id: &str) -> Span {
    info_span!("request", kind = %kind, id = %id)
}

/// Span covering the audit of one namespace.
pub fn audit_span(namespace: &Namespace, tier: Tier) -> Span {
    info_span!("audit", namespace = %namespace, tier = %tier)
}
