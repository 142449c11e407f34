//! Concurrent unique-key accumulator
//!
//! Grows monotonically for one run: no removal, no eviction, no capacity bound.

use dashmap::DashMap;
use std::collections::HashSet;

/// Map from aggregation key to the number of records that produced it.
///
/// Presence is what the report uses; counts are informational.
#[derive(Debug, Default, Clone)]
pub struct DedupStore {
    entries: DashMap<String, u64>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `key`. Returns `true` the first time a key is seen.
    pub fn insert(&self, key: String) -> bool {
        let mut seen = self.entries.entry(key).or_insert(0);
        *seen += 1;
        *seen == 1
    }

    /// Occurrences recorded for `key` (0 when absent)
    pub fn count(&self, key: &str) -> u64 {
        self.entries.get(key).map(|entry| *entry).unwrap_or(0)
    }

    /// Number of unique keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all keys seen so far
    pub fn items(&self) -> HashSet<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Consume the store, returning keys in lexical order
    pub fn into_sorted_keys(self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.into_iter().map(|(key, _)| key).collect();
        keys.sort_unstable();
        keys
    }

    /// Consume the store, returning keys in map order
    pub fn into_keys(self) -> Vec<String> {
        self.entries.into_iter().map(|(key, _)| key).collect()
    }
}
