//! Domain layer for the shoe catalog
//!
//! Pure types and rules: the product record and its natural key, run-local
//! deduplication, run reporting and the repository contract.

pub mod dedup;
pub mod product;
pub mod repositories;
pub mod run_report;

pub use dedup::DedupTracker;
pub use product::{CatalogQuery, Gender, NaturalKey, PriceOrder, ProductRecord};
pub use repositories::ProductStore;
pub use run_report::{FailureRecord, RunSummary};
