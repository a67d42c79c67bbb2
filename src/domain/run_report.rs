//! End-of-run reporting types
//!
//! Failure records are ephemeral: they are collected during a run, logged in
//! the summary and dropped. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::product::Gender;

/// A detail fetch that failed; the item itself was still persisted degraded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub name: String,
    pub brand: String,
    pub gender: Gender,
    pub color: String,
    pub url: String,
    pub reason: String,
}

/// Counters and failure log for one pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub pages_processed: u32,
    pub listing_entries: usize,
    /// Records contained in batches that were written successfully
    pub uploaded: usize,
    pub skipped_existing: usize,
    pub run_duplicates: usize,
    pub degraded: usize,
    /// Page indexes whose batch upsert failed
    pub failed_batches: Vec<u32>,
    pub failures: Vec<FailureRecord>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            pages_processed: 0,
            listing_entries: 0,
            uploaded: 0,
            skipped_existing: 0,
            run_duplicates: 0,
            degraded: 0,
            failed_batches: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.failed_batches.is_empty()
    }

    /// Emits the run summary to the operational log stream
    pub fn log(&self) {
        if !self.failures.is_empty() {
            tracing::warn!(count = self.failures.len(), "⚠️ {} failed products:", self.failures.len());
            for failure in &self.failures {
                tracing::warn!(
                    brand = %failure.brand,
                    name = %failure.name,
                    url = %failure.url,
                    reason = %failure.reason,
                    "- {} ({}) → {}",
                    failure.name,
                    failure.url,
                    failure.reason
                );
            }
        }

        if !self.failed_batches.is_empty() {
            tracing::warn!(pages = ?self.failed_batches, "Batch upload failed for {} page(s)", self.failed_batches.len());
        }

        tracing::info!(
            run_id = %self.run_id,
            pages = self.pages_processed,
            entries = self.listing_entries,
            uploaded = self.uploaded,
            skipped_existing = self.skipped_existing,
            duplicates = self.run_duplicates,
            degraded = self.degraded,
            cancelled = self.cancelled,
            elapsed_ms = u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            "🎉 All done. Total uploaded: {} shoes.",
            self.uploaded
        );
    }
}
