//! Dispute ledger: penalties against namespaces.
//!
//! Disputes live in the `disputes` shard collection. Every dispute is created
//! active and nothing in this crate ever resolves one; the sum of a
//! namespace's active penalties is subtracted from its balance before tier
//! eligibility is computed.

use dist_store::RecordStore;
use dist_types::{Namespace, Quantity, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::{Collection, RegistryError, ShardStore};

/// Lifecycle state of a dispute.
///
/// Unknown strings are kept verbatim so pages round-trip, and never count as
/// active.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisputeStatus {
    Active,
    Resolved,
    Other(String),
}

impl DisputeStatus {
    /// Whether the entry carried no status at all.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Other(s) if s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Other(s) => s,
        }
    }
}

impl Default for DisputeStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for DisputeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Self::Active,
            "resolved" => Self::Resolved,
            _ => Self::Other(s),
        }
    }
}

impl From<DisputeStatus> for String {
    fn from(status: DisputeStatus) -> Self {
        match status {
            DisputeStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded penalty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisputeEntry {
    #[serde(default)]
    pub id: String,
    pub namespace: Namespace,
    #[serde(default)]
    pub penalty: Quantity,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "DisputeStatus::is_unset")]
    pub status: DisputeStatus,
    /// Id of the request record that raised the dispute.
    #[serde(rename = "source", default)]
    pub source_request_id: Option<String>,
    #[serde(rename = "created", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DisputeEntry {
    pub fn is_active(&self) -> bool {
        self.status == DisputeStatus::Active
    }
}

pub struct DisputeLedger<S> {
    shards: Arc<ShardStore<S>>,
}

impl<S: RecordStore> DisputeLedger<S> {
    pub fn new(shards: Arc<ShardStore<S>>) -> Self {
        Self { shards }
    }

    /// Every dispute, in page order.
    pub async fn all(&self) -> Result<Vec<DisputeEntry>, RegistryError> {
        self.shards.scan_all(Collection::Disputes).await
    }

    /// Sum of the namespace's active penalties.
    pub async fn total_active_penalty(
        &self,
        namespace: &Namespace,
    ) -> Result<Quantity, RegistryError> {
        Ok(self
            .all()
            .await?
            .iter()
            .filter(|d| d.is_active() && &d.namespace == namespace)
            .map(|d| d.penalty)
            .sum())
    }

    /// Record a new active dispute.
    ///
    /// The id is `dispute-{unix millis}`; if that id is taken the timestamp is
    /// bumped a millisecond at a time until it is free.
    ///
    /// If an active dispute raised by the same source request already exists,
    /// it is returned and nothing is written, so a request processed twice
    /// penalises once.
    pub async fn record(
        &self,
        namespace: &Namespace,
        penalty: Quantity,
        reason: impl Into<String>,
        source_request_id: Option<String>,
    ) -> Result<DisputeEntry, RegistryError> {
        let existing = self.all().await?;
        if let Some(source) = source_request_id.as_deref() {
            if let Some(previous) = existing
                .iter()
                .find(|d| d.is_active() && d.source_request_id.as_deref() == Some(source))
            {
                info!(id = %previous.id, source, "dispute already recorded for request");
                return Ok(previous.clone());
            }
        }

        let taken: HashSet<String> = existing.into_iter().map(|d| d.id).collect();
        let now = self.shards.now();
        let mut millis = now.as_millis();
        let id = loop {
            let candidate = format!("dispute-{millis}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            millis += 1;
        };

        let entry = DisputeEntry {
            id,
            namespace: namespace.clone(),
            penalty,
            reason: reason.into(),
            status: DisputeStatus::Active,
            source_request_id,
            created_at: Some(now),
            extra: Map::new(),
        };
        let page = self
            .shards
            .append(Collection::Disputes, entry.clone())
            .await?;
        info!(id = %entry.id, %namespace, %penalty, page, "recorded dispute");
        Ok(entry)
    }
}
