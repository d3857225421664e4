//! The record store trait.

use async_trait::async_trait;
use dist_types::{Namespace, Quantity};

use crate::{Record, StoreError};

/// Result of looking a namespace up in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Whether the namespace is registered.
    pub exists: bool,
    /// Ledger address (genesis id) of the namespace, when known.
    pub address: Option<String>,
}

impl Resolution {
    pub fn found(address: impl Into<String>) -> Self {
        Self {
            exists: true,
            address: Some(address.into()),
        }
    }

    pub fn missing() -> Self {
        Self {
            exists: false,
            address: None,
        }
    }
}

/// Name-addressed record store backed by the external ledger.
///
/// Every call is one request/response round trip. Implementations are
/// expected to bound each call with a timeout and report it as
/// [`StoreError::Transport`]. No call spans more than one record; there are
/// no transactions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by its full name. `Ok(None)` means the record is absent.
    async fn get_record(&self, name: &str) -> Result<Option<Record>, StoreError>;

    /// Create a record. Fails with [`StoreError::Duplicate`] if it exists.
    async fn create_record(&self, name: &str, fields: &Record) -> Result<(), StoreError>;

    /// Overwrite the given fields of an existing record.
    async fn update_record(&self, name: &str, fields: &Record) -> Result<(), StoreError>;

    /// Balance of a named token account in display units. Absent accounts
    /// read as zero.
    async fn get_balance(&self, account: &str) -> Result<Quantity, StoreError>;

    /// Look a namespace up.
    async fn resolve_identifier(&self, namespace: &Namespace) -> Result<Resolution, StoreError>;

    /// Every record whose type field equals `type_tag`.
    async fn list_records_by_type(&self, type_tag: &str) -> Result<Vec<Record>, StoreError>;
}
