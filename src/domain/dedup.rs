//! Run-local duplicate tracking
//!
//! Guards against uploading the same logical item twice within one run when
//! pagination yields overlapping entries. Owned by the pipeline for the
//! duration of a single run and never persisted.

use std::collections::HashSet;

use super::product::NaturalKey;

#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &NaturalKey<'_>) -> bool {
        self.seen.contains(&key.dedup_key())
    }

    pub fn mark_seen(&mut self, key: &NaturalKey<'_>) {
        self.seen.insert(key.dedup_key());
    }

    /// Marks the key and reports whether it was novel
    pub fn check_and_mark(&mut self, key: &NaturalKey<'_>) -> bool {
        self.seen.insert(key.dedup_key())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
