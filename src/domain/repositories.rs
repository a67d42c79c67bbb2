//! Repository interface for the durable product catalog
//!
//! The ingestion core uses `exists_by` and `upsert_batch`; the presentation
//! layer reads through `query` and corrects single rows through `upsert_one`.

use anyhow::Result;
use async_trait::async_trait;

use super::product::{CatalogQuery, Gender, ProductRecord};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// True when any row matches (name, brand, gender)
    async fn exists_by(&self, name: &str, brand: &str, gender: Gender) -> Result<bool>;

    /// Writes a batch in one transaction, replacing rows that share the
    /// natural key (brand, name, gender, color). Returns the rows written.
    async fn upsert_batch(&self, records: &[ProductRecord]) -> Result<usize>;

    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ProductRecord>>;

    async fn upsert_one(&self, record: &ProductRecord) -> Result<()>;

    async fn count(&self) -> Result<u64>;
}
