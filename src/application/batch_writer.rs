//! Per-page batch upsert
//!
//! One call per listing page. A failed batch is logged with its page index
//! and not retried; later pages are unaffected.

use std::sync::Arc;
use tracing::{error, info};

use crate::domain::{ProductRecord, ProductStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing accumulated on the page
    Empty,
    Written(usize),
    Failed { reason: String },
}

pub struct BatchWriter<P: ?Sized> {
    store: Arc<P>,
}

impl<P: ProductStore + ?Sized> BatchWriter<P> {
    pub fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    pub async fn flush(&self, page: u32, records: &[ProductRecord]) -> BatchOutcome {
        if records.is_empty() {
            return BatchOutcome::Empty;
        }

        match self.store.upsert_batch(records).await {
            Ok(written) => {
                info!(page, count = written, "📤 Uploaded {} shoes from page {}", written, page);
                BatchOutcome::Written(written)
            }
            Err(e) => {
                error!(page, count = records.len(), "❌ Upload error on page {}: {:#}", page, e);
                BatchOutcome::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }
}
