//! Nullable ledger: thread-safe in-memory record store for testing.

use async_trait::async_trait;
use dist_store::{Record, RecordStore, Resolution, StoreError};
use dist_types::{Namespace, Quantity};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory ledger for testing.
///
/// Records are keyed by their full name. Individual names can be made to
/// fail, or the whole ledger taken offline, to exercise transport failures.
pub struct NullLedger {
    records: Mutex<BTreeMap<String, Record>>,
    balances: Mutex<HashMap<String, Quantity>>,
    namespaces: Mutex<HashMap<String, Option<String>>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            balances: Mutex::new(HashMap::new()),
            namespaces: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Store a record directly, bypassing the write log.
    pub fn insert_record(&self, name: impl Into<String>, record: Record) {
        self.records.lock().unwrap().insert(name.into(), record);
    }

    /// Current contents of a record.
    pub fn record(&self, name: &str) -> Option<Record> {
        self.records.lock().unwrap().get(name).cloned()
    }

    /// Names of every stored record, sorted.
    pub fn record_names(&self) -> Vec<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }

    /// Set the balance of a token account.
    pub fn set_balance(&self, account: impl Into<String>, balance: Quantity) {
        self.balances.lock().unwrap().insert(account.into(), balance);
    }

    /// Register a namespace, giving it a ledger address.
    pub fn register_namespace(&self, namespace: impl Into<String>, address: impl Into<String>) {
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.into(), Some(address.into()));
    }

    /// Make every call touching `name` (record, account or namespace) fail.
    pub fn fail_on(&self, name: impl Into<String>) {
        self.failing.lock().unwrap().insert(name.into());
    }

    /// Undo [`fail_on`](Self::fail_on).
    pub fn recover(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }

    /// Make every call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Names passed to successful create/update calls, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self, name: &str) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("ledger offline".into()));
        }
        if self.failing.lock().unwrap().contains(name) {
            return Err(StoreError::Transport(format!("injected failure for {name}")));
        }
        Ok(())
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for NullLedger {
    async fn get_record(&self, name: &str) -> Result<Option<Record>, StoreError> {
        self.check(name)?;
        Ok(self.record(name))
    }

    async fn create_record(&self, name: &str, fields: &Record) -> Result<(), StoreError> {
        self.check(name)?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        records.insert(name.to_string(), fields.clone());
        self.writes.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn update_record(&self, name: &str, fields: &Record) -> Result<(), StoreError> {
        self.check(name)?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        record.merge(fields);
        self.writes.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn get_balance(&self, account: &str) -> Result<Quantity, StoreError> {
        self.check(account)?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(Quantity::ZERO))
    }

    async fn resolve_identifier(&self, namespace: &Namespace) -> Result<Resolution, StoreError> {
        self.check(namespace.as_str())?;
        Ok(match self.namespaces.lock().unwrap().get(namespace.as_str()) {
            Some(address) => Resolution {
                exists: true,
                address: address.clone(),
            },
            None => Resolution::missing(),
        })
    }

    async fn list_records_by_type(&self, type_tag: &str) -> Result<Vec<Record>, StoreError> {
        self.check(type_tag)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.type_tag() == Some(type_tag))
            .cloned()
            .collect())
    }
}
