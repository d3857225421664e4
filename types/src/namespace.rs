//! Namespace identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Suffix of the token account whose balance gates a namespace's tier.
pub const VERIFICATION_ACCOUNT_SUFFIX: &str = "::DIST-verification";

/// The identifier being verified.
///
/// Identity is the string itself; the ledger address that goes with it is
/// informational only.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace, rejecting empty or whitespace-only names.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(TypeError::EmptyNamespace);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the account queried for this namespace's balance.
    pub fn verification_account(&self) -> String {
        format!("{}{VERIFICATION_ACCOUNT_SUFFIX}", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}
