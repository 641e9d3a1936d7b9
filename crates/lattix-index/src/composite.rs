//! Composite Index
//!
//! Multi-field exact and partial match. Keys are the declared field values
//! stringified and joined with a delimiter; a missing or null field maps to
//! a literal `NULL` token unless the index is `sparse`, in which case such
//! documents are skipped entirely. Partial search fixes a subset of field
//! positions and wildcards the rest; matching is a linear scan over stored
//! keys, acceptable at the low key cardinality composite indexes carry.

use crate::error::IndexError;
use crate::value::{FieldValue, NodeData};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Separator between field values in a composite key
const DELIMITER: char = '|';

/// Token standing in for a missing/null field in a non-sparse index
const NULL_TOKEN: &str = "NULL";

/// Configuration of one composite index instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Ordered field names forming the key
    pub fields: Vec<String>,
    /// Reject a second id under an occupied key
    #[serde(default)]
    pub unique: bool,
    /// Skip documents with any null/missing declared field
    #[serde(default)]
    pub sparse: bool,
}

impl CompositeConfig {
    /// Create a non-unique, non-sparse config over the given fields
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            sparse: false,
        }
    }

    /// Enable the unique constraint
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Enable sparse behavior
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }
}

/// Composite multi-field index.
#[derive(Debug, Clone)]
pub struct CompositeIndex {
    name: String,
    config: CompositeConfig,
    /// composite key -> ids stored under it
    entries: BTreeMap<String, BTreeSet<String>>,
    /// id -> keys it occupies (supports removal without the original values)
    keys_by_id: HashMap<String, HashSet<String>>,
}

impl CompositeIndex {
    /// Create an index with the given name and configuration.
    pub fn new(name: impl Into<String>, config: CompositeConfig) -> Self {
        Self {
            name: name.into(),
            config,
            entries: BTreeMap::new(),
            keys_by_id: HashMap::new(),
        }
    }

    /// Declared field names, in key order
    pub fn fields(&self) -> &[String] {
        &self.config.fields
    }

    /// Number of distinct composite keys
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of stored (key, id) pairs
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(|ids| ids.len()).sum()
    }

    /// Remove everything, keeping the configuration
    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys_by_id.clear();
    }

    /// Build the composite key for a document, or None when the sparse
    /// config skips it.
    fn build_key(&self, values: &NodeData) -> Option<String> {
        let mut parts = Vec::with_capacity(self.config.fields.len());
        for field in &self.config.fields {
            match values.get(field) {
                Some(value) if !value.is_null() => parts.push(value.to_string()),
                _ if self.config.sparse => return None,
                _ => parts.push(NULL_TOKEN.to_string()),
            }
        }
        Some(parts.join(&DELIMITER.to_string()))
    }

    /// Add an id under the key built from `values`.
    ///
    /// A `unique` index raises a constraint violation when the key already
    /// holds a different id; sparse-skipped documents return Ok.
    pub fn add_entry(&mut self, id: &str, values: &NodeData) -> Result<(), IndexError> {
        let Some(key) = self.build_key(values) else {
            return Ok(());
        };

        if self.config.unique {
            if let Some(ids) = self.entries.get(&key) {
                if !ids.is_empty() && !ids.contains(id) {
                    return Err(IndexError::constraint_violation(&self.name, key));
                }
            }
        }
        self.entries
            .entry(key.clone())
            .or_default()
            .insert(id.to_string());
        self.keys_by_id
            .entry(id.to_string())
            .or_default()
            .insert(key);
        Ok(())
    }

    /// Remove an id from the key built from `values`; absent pairs are a no-op.
    pub fn remove_entry(&mut self, id: &str, values: &NodeData) {
        let Some(key) = self.build_key(values) else {
            return;
        };
        self.remove_pair(id, &key);
    }

    /// Remove an id from every key it occupies.
    pub fn remove_id(&mut self, id: &str) {
        let Some(keys) = self.keys_by_id.get(id).cloned() else {
            return;
        };
        for key in keys {
            self.remove_pair(id, &key);
        }
    }

    fn remove_pair(&mut self, id: &str, key: &str) {
        if let Some(ids) = self.entries.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
        if let Some(keys) = self.keys_by_id.get_mut(id) {
            keys.remove(key);
            if keys.is_empty() {
                self.keys_by_id.remove(id);
            }
        }
    }

    /// Find the ids whose keys agree with the given fields; omitted fields
    /// are wildcards. Results are sorted and deduplicated.
    pub fn search(&self, partial: &NodeData) -> Vec<String> {
        // Fixed positions; None is a wildcard
        let pattern: Vec<Option<String>> = self
            .config
            .fields
            .iter()
            .map(|field| match partial.get(field) {
                Some(FieldValue::Null) | None => None,
                Some(value) => Some(value.to_string()),
            })
            .collect();

        let mut out: Vec<String> = Vec::new();
        for (key, ids) in &self.entries {
            let parts: Vec<&str> = key.split(DELIMITER).collect();
            if parts.len() != pattern.len() {
                continue;
            }
            let matches = pattern
                .iter()
                .zip(&parts)
                .all(|(want, have)| want.as_deref().is_none_or(|w| w == *have));
            if matches {
                out.extend(ids.iter().cloned());
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}
