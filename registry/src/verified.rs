//! Verification registry: which namespace is verified at which tier.
//!
//! Each verified tier (L1..L3) is its own shard collection. A namespace has
//! at most one entry across all of them; [`VerificationRegistry::add`]
//! enforces this by removing the namespace from every other tier first.
//!
//! Moving a namespace between tiers is two record writes (remove, then
//! append) with nothing tying them together. A crash in between can leave the
//! namespace in two tiers or in none. Both steps are idempotent, so running
//! `add` or an audit again converges.

use dist_store::RecordStore;
use dist_types::{Namespace, Quantity, Tier, Timestamp};
use futures_util::{pin_mut, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::{Collection, RegistryError, ShardStore};

/// A namespace's membership in one tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEntry {
    pub namespace: Namespace,
    /// Ledger address of the namespace, for display.
    #[serde(rename = "genesis", default)]
    pub address: Option<String>,
    #[serde(rename = "verified", default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<Timestamp>,
    /// Raw balance at the time the entry was written.
    #[serde(default)]
    pub balance: Quantity,
    /// Fields written by other tools, kept on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What [`VerificationRegistry::add`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry was appended to the given page.
    Added { page: usize },
    /// The namespace was already in the target tier.
    AlreadyPresent,
}

pub struct VerificationRegistry<S> {
    shards: Arc<ShardStore<S>>,
}

impl<S: RecordStore> VerificationRegistry<S> {
    pub fn new(shards: Arc<ShardStore<S>>) -> Self {
        Self { shards }
    }

    /// Every entry of one tier, in page order. `L0` is always empty.
    pub async fn entries(&self, tier: Tier) -> Result<Vec<VerifiedEntry>, RegistryError> {
        if !tier.is_verified() {
            return Ok(Vec::new());
        }
        self.shards.scan_all(Collection::Verified(tier)).await
    }

    /// The namespace's entry in one tier, stopping at the page that holds it.
    pub async fn find_in(
        &self,
        namespace: &Namespace,
        tier: Tier,
    ) -> Result<Option<VerifiedEntry>, RegistryError> {
        if !tier.is_verified() {
            return Ok(None);
        }
        let pages = self.shards.pages::<VerifiedEntry>(Collection::Verified(tier));
        pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            if let Some(entry) = page.entries.into_iter().find(|e| &e.namespace == namespace) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// The namespace's highest-tier entry, checking L3, then L2, then L1.
    pub async fn find(
        &self,
        namespace: &Namespace,
    ) -> Result<Option<(Tier, VerifiedEntry)>, RegistryError> {
        for tier in Tier::VERIFIED_DESC {
            if let Some(entry) = self.find_in(namespace, tier).await? {
                return Ok(Some((tier, entry)));
            }
        }
        Ok(None)
    }

    /// Tier the namespace is currently verified at, `L0` if none.
    pub async fn current_tier(&self, namespace: &Namespace) -> Result<Tier, RegistryError> {
        Ok(self
            .find(namespace)
            .await?
            .map(|(tier, _)| tier)
            .unwrap_or(Tier::L0))
    }

    /// Verify `namespace` at `tier`.
    ///
    /// Removes the namespace from every other tier, then appends a fresh
    /// entry unless one already exists in `tier`.
    pub async fn add(
        &self,
        namespace: &Namespace,
        address: Option<String>,
        tier: Tier,
        balance: Quantity,
    ) -> Result<AddOutcome, RegistryError> {
        if !tier.is_verified() {
            return Err(RegistryError::UnstorableTier(tier));
        }

        for other in Tier::VERIFIED_DESC.into_iter().filter(|t| *t != tier) {
            if self.remove(namespace, other).await? {
                info!(%namespace, from = %other, to = %tier, "moved namespace between tiers");
            }
        }

        if self.find_in(namespace, tier).await?.is_some() {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let entry = VerifiedEntry {
            namespace: namespace.clone(),
            address,
            verified_at: Some(self.shards.now()),
            balance,
            extra: Map::new(),
        };
        let page = self.shards.append(Collection::Verified(tier), entry).await?;
        Ok(AddOutcome::Added { page })
    }

    /// Remove the namespace from one tier. Returns whether an entry was removed.
    pub async fn remove(&self, namespace: &Namespace, tier: Tier) -> Result<bool, RegistryError> {
        if !tier.is_verified() {
            return Ok(false);
        }
        self.shards
            .remove_where(Collection::Verified(tier), |e: &VerifiedEntry| {
                &e.namespace == namespace
            })
            .await
    }
}
