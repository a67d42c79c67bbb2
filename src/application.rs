//! Application layer module
//!
//! The ingestion use case and the collaborators it sequences per item.

pub mod batch_writer;
pub mod detail_fetcher;
pub mod ingestion_pipeline;
pub mod persistence_gate;

pub use batch_writer::{BatchOutcome, BatchWriter};
pub use detail_fetcher::DetailFetcher;
pub use ingestion_pipeline::IngestionPipeline;
pub use persistence_gate::PersistenceGate;
