//! Shard collections and their ledger naming scheme.
//!
//! Page names are part of the on-ledger format and must stay bit-exact:
//! - `{root}:{tier}-verified-{index}`, payload field `namespaces`
//! - `{root}:disputes-{index}`, payload field `disputes`
//!
//! Page indices start at 1.

use dist_store::{Record, TYPE_FIELD};
use dist_types::{Tier, Timestamp};
use std::fmt;

/// Format version written into every page header.
pub const PAGE_FORMAT_VERSION: u32 = 1;

/// A paginated list stored in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Verified namespaces of one tier.
    Verified(Tier),
    /// Every recorded dispute.
    Disputes,
}

impl Collection {
    /// Full ledger name of a page.
    pub fn page_name(&self, root: &str, index: usize) -> String {
        format!("{root}:{self}-{index}")
    }

    /// Field that holds the JSON-encoded entry array.
    pub fn payload_field(&self) -> &'static str {
        match self {
            Self::Verified(_) => "namespaces",
            Self::Disputes => "disputes",
        }
    }

    /// Value of the page's type field.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Verified(_) => "verification-registry",
            Self::Disputes => "disputes-registry",
        }
    }

    /// Header fields written with every page.
    pub fn header(&self, updated: Timestamp) -> Record {
        let header = Record::new()
            .with(TYPE_FIELD, self.type_tag())
            .with("version", PAGE_FORMAT_VERSION)
            .with("updated", updated.to_rfc3339());
        match self {
            Self::Verified(tier) => header.with("tier", tier.as_str()),
            Self::Disputes => header,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified(tier) => write!(f, "{tier}-verified"),
            Self::Disputes => f.write_str("disputes"),
        }
    }
}
