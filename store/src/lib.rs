//! Ledger record store contract.
//!
//! The registry keeps no local database: every shard page, dispute page and
//! request lives as a named record in the external ledger. The rest of the
//! workspace depends only on the [`RecordStore`] trait defined here; the HTTP
//! client and the in-memory test ledger both implement it.

pub mod error;
pub mod ledger;
pub mod record;

pub use error::StoreError;
pub use ledger::{RecordStore, Resolution};
pub use record::{Record, TYPE_FIELD};
