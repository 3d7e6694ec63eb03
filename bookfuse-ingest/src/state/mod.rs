//! Enrichment state store
//!
//! One `EnrichmentTable` per source holds the single best record seen
//! so far for every canonical key. Tables are owned, single-writer
//! structures passed by reference into each stage; checkpoint I/O
//! lives in [`checkpoint`].

pub mod checkpoint;

use crate::types::QualityScore;
use std::collections::HashMap;

/// Per-source mapping from canonical key to its best known record
///
/// `upgrade` never regresses: replaying any sequence of candidates in
/// any order converges to the same table.
#[derive(Debug, Clone)]
pub struct EnrichmentTable<R> {
    records: HashMap<String, R>,
}

impl<R> Default for EnrichmentTable<R> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<R: QualityScore> EnrichmentTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for `key` iff the candidate scores strictly
    /// higher than the incumbent. Ties keep the existing record, which
    /// makes repeated application of the same candidate a no-op.
    pub fn upgrade(&mut self, key: impl Into<String>, candidate: R) {
        let key = key.into();
        match self.records.get(&key) {
            Some(existing) if candidate.quality_score() <= existing.quality_score() => {}
            _ => {
                self.records.insert(key, candidate);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &R)> {
        self.records.iter()
    }

    /// Records sorted by key, for deterministic checkpoint output
    pub fn sorted_records(&self) -> Vec<(&String, &R)> {
        let mut rows: Vec<_> = self.records.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }
}
