//! Shared fixtures for pipeline integration tests
#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use shoe_catalog_lib::domain::{CatalogQuery, Gender, ProductRecord, ProductStore};
use shoe_catalog_lib::infrastructure::config::AppConfig;
use shoe_catalog_lib::infrastructure::{
    BrowsingSession, DatabaseConnection, DocumentContext, FetchFailure, ListingDocument,
    ReadyCondition, SqliteProductRepository,
};

pub fn test_config(max_pages: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.crawl.max_pages = max_pages;
    config.crawl.listing_timeout_ms = 200;
    config.crawl.detail_timeout_ms = 200;
    config.crawl.listing_ready_timeout_ms = 10;
    config.crawl.detail_ready_timeout_ms = 10;
    config.crawl.ready_poll_interval_ms = 5;
    config
}

pub fn listing_url(config: &AppConfig, page: u32) -> String {
    config.site.listing_url(page)
}

pub fn detail_url(config: &AppConfig, href: &str) -> String {
    config.site.detail_url(href)
}

/// Listing card markup as rendered by the retailer
pub fn card(brand: &str, name: &str, price: &str, href: &str) -> String {
    format!(
        r#"<a class="flex flex-1 flex-col" href="{href}">
             <img src="/media/{name}.jpg" />
             <p class="typo-subtitle-2">{brand}</p>
             <p class="typo-subtitle-2">{name}</p>
             <p class="typo-subtitle-1">{price}</p>
           </a>"#
    )
}

pub fn listing(cards: &[String]) -> String {
    format!(
        "<html><body><div class=\"grid\">{}</div></body></html>",
        cards.join("\n")
    )
}

pub fn detail(description: &str, color_label: &str) -> String {
    format!(
        r#"<html><body>
             <div class="grid gap-4"><p>{description}</p></div>
             <p class="typo-subtitle-1 mb-1">{color_label}</p>
           </body></html>"#
    )
}

#[derive(Default)]
struct Script {
    listings: HashMap<String, Result<ListingDocument, FetchFailure>>,
    details: HashMap<String, Result<String, FetchFailure>>,
    cancel_on: Option<(String, CancellationToken)>,
}

#[derive(Default)]
struct Recorder {
    listing_loads: Mutex<Vec<String>>,
    detail_loads: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    shut_down: AtomicBool,
}

/// In-memory [`BrowsingSession`] serving scripted documents
///
/// Unscripted listing URLs load as empty pages, unscripted detail URLs fail
/// with a 404.
#[derive(Clone, Default)]
pub struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    recorder: Arc<Recorder>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, url: String, html: String) -> Self {
        self.script_listing(url, Ok(ListingDocument::complete(html)))
    }

    pub fn script_listing(self, url: String, outcome: Result<ListingDocument, FetchFailure>) -> Self {
        self.script.lock().unwrap().listings.insert(url, outcome);
        self
    }

    pub fn with_detail(self, url: String, html: String) -> Self {
        self.script_detail(url.clone(), Ok(html))
    }

    pub fn script_detail(self, url: String, outcome: Result<String, FetchFailure>) -> Self {
        self.script.lock().unwrap().details.insert(url, outcome);
        self
    }

    pub fn with_detail_timeout(self, url: String) -> Self {
        let failure = FetchFailure::timeout(&url, Duration::from_millis(200));
        self.script_detail(url, Err(failure))
    }

    /// Cancel `token` once the detail page at `url` has been loaded
    pub fn cancel_after_detail(self, url: String, token: CancellationToken) -> Self {
        self.script.lock().unwrap().cancel_on = Some((url, token));
        self
    }

    pub fn detail_loads(&self) -> Vec<String> {
        self.recorder.detail_loads.lock().unwrap().clone()
    }

    pub fn listing_loads(&self) -> Vec<String> {
        self.recorder.listing_loads.lock().unwrap().clone()
    }

    pub fn contexts_opened(&self) -> usize {
        self.recorder.opened.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.recorder.closed.load(Ordering::SeqCst)
    }

    pub fn was_shut_down(&self) -> bool {
        self.recorder.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowsingSession for ScriptedSession {
    async fn load_listing(
        &self,
        url: &str,
        _timeout: Duration,
        _ready: &ReadyCondition,
    ) -> Result<ListingDocument, FetchFailure> {
        self.recorder.listing_loads.lock().unwrap().push(url.to_string());
        let script = self.script.lock().unwrap();
        script
            .listings
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(ListingDocument::complete("<html><body></body></html>")))
    }

    async fn open_context(&self) -> Result<Box<dyn DocumentContext>, FetchFailure> {
        self.recorder.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedContext {
            script: Arc::clone(&self.script),
            recorder: Arc::clone(&self.recorder),
            closed: false,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.recorder.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedContext {
    script: Arc<Mutex<Script>>,
    recorder: Arc<Recorder>,
    closed: bool,
}

#[async_trait]
impl DocumentContext for ScriptedContext {
    async fn load(
        &mut self,
        url: &str,
        _timeout: Duration,
        _ready: &ReadyCondition,
    ) -> Result<String, FetchFailure> {
        self.recorder.detail_loads.lock().unwrap().push(url.to_string());
        let script = self.script.lock().unwrap();
        if let Some((trigger, token)) = &script.cancel_on {
            if trigger == url {
                token.cancel();
            }
        }
        script.details.get(url).cloned().unwrap_or_else(|| {
            Err(FetchFailure::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.recorder.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// SQLite store in a throwaway directory; keep the `TempDir` alive
pub async fn temp_store() -> Result<(TempDir, Arc<SqliteProductRepository>)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite:{}", dir.path().join("catalog.db").to_string_lossy());
    let db = DatabaseConnection::new(&url, 2).await?;
    db.migrate().await?;
    Ok((dir, Arc::new(SqliteProductRepository::new(db.pool().clone()))))
}

/// Store wrapper that injects failures into the existence check or into
/// batches containing a given product name
pub struct FlakyStore {
    inner: Arc<SqliteProductRepository>,
    fail_exists: AtomicBool,
    poisoned_names: Mutex<HashSet<String>>,
    exists_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteProductRepository>) -> Self {
        Self {
            inner,
            fail_exists: AtomicBool::new(false),
            poisoned_names: Mutex::new(HashSet::new()),
            exists_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_exists(self) -> Self {
        self.fail_exists.store(true, Ordering::SeqCst);
        self
    }

    pub fn poison(self, name: &str) -> Self {
        self.poisoned_names.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductStore for FlakyStore {
    async fn exists_by(&self, name: &str, brand: &str, gender: Gender) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            bail!("database is locked");
        }
        self.inner.exists_by(name, brand, gender).await
    }

    async fn upsert_batch(&self, records: &[ProductRecord]) -> Result<usize> {
        let poisoned = {
            let names = self.poisoned_names.lock().unwrap();
            records.iter().any(|r| names.contains(&r.name))
        };
        if poisoned {
            bail!("constraint failed");
        }
        self.inner.upsert_batch(records).await
    }

    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ProductRecord>> {
        self.inner.query(query).await
    }

    async fn upsert_one(&self, record: &ProductRecord) -> Result<()> {
        self.inner.upsert_one(record).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

/// Every stored row, cheapest first
pub async fn stored_rows(store: &dyn ProductStore) -> Result<Vec<ProductRecord>> {
    store
        .query(&CatalogQuery::new(None, shoe_catalog_lib::domain::PriceOrder::Asc))
        .await
}

pub fn find<'a>(rows: &'a [ProductRecord], name: &str) -> Option<&'a ProductRecord> {
    rows.iter().find(|r| r.name == name)
}
