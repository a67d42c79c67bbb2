//! Page crawler and orchestrator for one ingestion run
//!
//! Pages `1..=max_pages` are processed strictly in order, items within a page
//! likewise. Nothing inside a run is fatal: listing failures yield an empty
//! page, detail failures yield degraded records, store failures are logged.
//! The cancellation token is checked before each page and each item; a
//! cancelled run still flushes the batch of the page it was on.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::batch_writer::{BatchOutcome, BatchWriter};
use super::detail_fetcher::DetailFetcher;
use super::persistence_gate::PersistenceGate;
use crate::domain::{DedupTracker, FailureRecord, Gender, ProductRecord, ProductStore, RunSummary};
use crate::infrastructure::browsing::{BrowsingSession, ReadyCondition};
use crate::infrastructure::config::{AppConfig, CrawlConfig, SiteConfig};
use crate::infrastructure::parsing::fields::infer_gender;
use crate::infrastructure::parsing::{
    HtmlExtractor, ListingEntry, ProductDetails, ProductListParser,
};

pub struct IngestionPipeline<S, P: ?Sized> {
    session: S,
    site: SiteConfig,
    crawl: CrawlConfig,
    list_parser: ProductListParser,
    listing_ready: ReadyCondition,
    detail_fetcher: DetailFetcher,
    gate: PersistenceGate<P>,
    writer: BatchWriter<P>,
}

/// Mutable state threaded through one run
struct RunState {
    dedup: DedupTracker,
    summary: RunSummary,
}

impl<S, P> IngestionPipeline<S, P>
where
    S: BrowsingSession,
    P: ProductStore + ?Sized,
{
    /// Compile extractors from configuration; a bad selector or base URL is
    /// rejected here, before any page is loaded
    pub fn new(session: S, store: Arc<P>, config: &AppConfig) -> Result<Self> {
        let list_parser = ProductListParser::new(&config.selectors.listing, &config.site.base_url)?;
        let detail_fetcher = DetailFetcher::new(&config.selectors, &config.crawl)?;
        let listing_ready = ReadyCondition::new(
            config.selectors.listing.card.clone(),
            config.crawl.listing_ready_timeout(),
            config.crawl.ready_poll_interval(),
        );

        Ok(Self {
            session,
            site: config.site.clone(),
            crawl: config.crawl.clone(),
            list_parser,
            listing_ready,
            detail_fetcher,
            gate: PersistenceGate::new(Arc::clone(&store)),
            writer: BatchWriter::new(store),
        })
    }

    /// Run the crawl to the page ceiling, or until cancelled
    pub async fn run(&self, cancel: &CancellationToken) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.run_pages(run_id, cancel).instrument(span).await
    }

    async fn run_pages(&self, run_id: Uuid, cancel: &CancellationToken) -> RunSummary {
        let started = Instant::now();
        let mut state = RunState {
            dedup: DedupTracker::new(),
            summary: RunSummary::new(run_id),
        };

        info!(max_pages = self.crawl.max_pages, "Starting ingestion run");

        for page in 1..=self.crawl.max_pages {
            if cancel.is_cancelled() {
                info!(page, "Cancellation requested, stopping before page {}", page);
                state.summary.cancelled = true;
                break;
            }

            info!(page, "🔄 Scraping page {}...", page);
            let entries = self.load_entries(page).await;
            state.summary.pages_processed += 1;
            state.summary.listing_entries += entries.len();

            if entries.is_empty() && self.crawl.stop_on_empty_page {
                info!(page, "Listing page {} is empty, stopping early", page);
                break;
            }

            let mut batch = Vec::new();
            for entry in &entries {
                if cancel.is_cancelled() {
                    info!(page, "Cancellation requested, flushing page {} and stopping", page);
                    state.summary.cancelled = true;
                    break;
                }
                if let Some(record) = self.process_entry(page, entry, &mut state).await {
                    batch.push(record);
                }
            }

            match self.writer.flush(page, &batch).await {
                BatchOutcome::Written(written) => state.summary.uploaded += written,
                BatchOutcome::Failed { .. } => state.summary.failed_batches.push(page),
                BatchOutcome::Empty => {}
            }

            info!(
                page,
                uploaded = state.summary.uploaded,
                "✅ Page {} finished, total uploaded so far: {}",
                page,
                state.summary.uploaded
            );

            if state.summary.cancelled {
                break;
            }
        }

        if let Err(e) = self.session.shutdown().await {
            warn!("Failed to shut down browsing session: {:#}", e);
        }

        state.summary.elapsed = started.elapsed();
        state.summary.log();
        state.summary
    }

    /// Load and extract one listing page; failures yield no entries
    async fn load_entries(&self, page: u32) -> Vec<ListingEntry> {
        let url = self.site.listing_url(page);
        match self
            .session
            .load_listing(&url, self.crawl.listing_timeout(), &self.listing_ready)
            .await
        {
            Ok(document) => {
                if !document.complete {
                    warn!(page, url = %url, "⚠️ Timeout loading listing page {}", page);
                }
                self.list_parser.parse_str(&document.html)
            }
            Err(e) => {
                warn!(page, url = %url, reason = %e, "⚠️ Failed loading listing page {}", page);
                Vec::new()
            }
        }
    }

    /// Gate, enrich and dedup one listing entry; `None` when it is skipped
    async fn process_entry(
        &self,
        page: u32,
        entry: &ListingEntry,
        state: &mut RunState,
    ) -> Option<ProductRecord> {
        let gender = infer_gender(&entry.href);
        let url = self.site.detail_url(&entry.href);

        if self.gate.already_ingested(&entry.name, &entry.brand, gender).await {
            debug!(page, brand = %entry.brand, name = %entry.name, "Already stored, skipping");
            state.summary.skipped_existing += 1;
            return None;
        }

        let record = match self.detail_fetcher.fetch(&self.session, &url).await {
            Ok(details) => {
                info!(page, "✅ Scraped: {} {}", entry.brand, entry.name);
                build_record(entry, gender, url, Some(details))
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    page,
                    brand = %entry.brand,
                    name = %entry.name,
                    url = %url,
                    reason = %reason,
                    "❌ Failed to load product: {}",
                    entry.name
                );
                state.summary.failures.push(FailureRecord {
                    name: entry.name.clone(),
                    brand: entry.brand.clone(),
                    gender,
                    color: String::new(),
                    url: url.clone(),
                    reason,
                });
                state.summary.degraded += 1;
                build_record(entry, gender, url, None)
            }
        };

        if !state.dedup.check_and_mark(&record.natural_key()) {
            debug!(page, key = %record.natural_key().dedup_key(), "Duplicate within run, skipping");
            state.summary.run_duplicates += 1;
            return None;
        }

        Some(record)
    }
}

/// Listing data plus detail enrichment; `None` details marks the record degraded
fn build_record(
    entry: &ListingEntry,
    gender: Gender,
    url: String,
    details: Option<ProductDetails>,
) -> ProductRecord {
    let has_error = details.is_none();
    let details = details.unwrap_or_default();
    ProductRecord {
        name: entry.name.clone(),
        brand: entry.brand.clone(),
        image: entry.image.clone(),
        price: entry.price,
        description: details.description,
        gender,
        color: details.color,
        url,
        has_error,
    }
}
