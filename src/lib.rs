//! Shoe Catalog - retailer listing ingestion
//!
//! Crawls a paginated shoe listing, enriches each product from its detail
//! page and upserts the normalized catalog into SQLite, one batch per page.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::IngestionPipeline;
pub use domain::{CatalogQuery, Gender, PriceOrder, ProductRecord, ProductStore, RunSummary};
