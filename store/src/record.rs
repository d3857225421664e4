//! Opaque ledger records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field every registry-managed record carries to name its kind
/// (`verification-request`, `verification-registry`, ...).
pub const TYPE_FIELD: &str = "distordia-type";

/// A ledger record: a flat set of named JSON fields.
///
/// The same type is used for the fields passed to create/update calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A field's value as a string, if it is one.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// The record's kind, from [`TYPE_FIELD`].
    pub fn type_tag(&self) -> Option<&str> {
        self.get_str(TYPE_FIELD)
    }

    /// Overwrite this record's fields with `other`'s, keeping the rest.
    pub fn merge(&mut self, other: &Record) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
