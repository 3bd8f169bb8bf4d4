//! Flat acquisition metadata record

use crate::error::{MetadataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Flat key → string mapping recovered from one acquisition.
///
/// Values stay strings at this layer; numeric coercion is left to the caller,
/// which typically appends the record as columns onto a per-movie row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Inserts a field that must not exist yet.
    pub fn insert_unique(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        match self.fields.entry(key.into()) {
            btree_map::Entry::Occupied(entry) => Err(MetadataError::DuplicateMetadataKey {
                key: entry.key().clone(),
            }),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value.into());
                Ok(())
            }
        }
    }

    /// Returns a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns true if the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Parses a field as a float, `None` when absent or not numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|raw| raw.trim().parse().ok())
    }

    /// Looks up a field and parses it as a float.
    ///
    /// # Errors
    ///
    /// `MissingField` when absent, `InvalidNumber` when not numeric.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        let raw = self
            .get(key)
            .ok_or_else(|| MetadataError::MissingField(key.to_string()))?;
        raw.trim()
            .parse::<f64>()
            .map_err(|_| MetadataError::InvalidNumber {
                field: key.to_string(),
                value: raw.to_string(),
            })
    }

    /// Copies every field of `other` into this record; `other` wins on conflicts.
    pub fn merge(&mut self, other: MetadataRecord) {
        self.fields.extend(other.fields);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes the record into its underlying map.
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl From<BTreeMap<String, String>> for MetadataRecord {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl IntoIterator for MetadataRecord {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
