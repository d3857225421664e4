//! Tiered verification registry.
//!
//! Verified namespaces and disputes are stored in the external ledger as
//! paginated, fixed-capacity records ("shards"):
//! - **Tier policy** maps an effective balance to the highest tier it qualifies for.
//! - **Shard store** is the paginated-list abstraction: probe, append with
//!   capacity rollover, filter-and-rewrite.
//! - **Verification registry** keeps one entry per namespace across tiers L1..L3.
//! - **Dispute ledger** records penalties that reduce a namespace's effective balance.
//!
//! Nothing is cached: every operation re-reads the pages it touches.

pub mod collection;
pub mod disputes;
pub mod error;
pub mod policy;
pub mod shard;
pub mod verified;

pub use collection::Collection;
pub use disputes::{DisputeEntry, DisputeLedger, DisputeStatus};
pub use error::{PolicyError, RegistryError};
pub use policy::{effective_balance, TierPolicy, TierThresholds};
pub use shard::{Page, ShardEntry, ShardStore, DEFAULT_CAPACITY, MAX_PAGES};
pub use verified::{AddOutcome, VerificationRegistry, VerifiedEntry};
