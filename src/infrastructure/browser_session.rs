//! Headless Chromium browsing session for client-rendered listings
//!
//! One browser process and one listing tab live for the whole run. Each detail
//! fetch gets its own tab wrapped in [`ChromiumDocumentContext`], which is
//! closed explicitly by the fetcher and, failing that, from `Drop`.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::browsing::{BrowsingSession, DocumentContext, ListingDocument, ReadyCondition};
use super::fetch_error::FetchFailure;

pub struct ChromiumBrowsingSession {
    browser: Mutex<Option<Browser>>,
    listing_page: Mutex<Option<Page>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumBrowsingSession {
    /// Launch a headless browser and drive its CDP event loop
    pub async fn launch(user_agent: &str) -> Result<Self> {
        let config = BrowserConfig::builder()
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {e}"))?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        info!("Headless browser launched");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            listing_page: Mutex::new(None),
            handler: Mutex::new(Some(handler)),
        })
    }

    async fn new_page(&self) -> Result<Page, FetchFailure> {
        let browser = self.browser.lock().await;
        let browser = browser
            .as_ref()
            .ok_or_else(|| FetchFailure::browser("browser already shut down"))?;
        browser
            .new_page("about:blank")
            .await
            .map_err(FetchFailure::browser)
    }

    async fn listing_page(&self) -> Result<Page, FetchFailure> {
        let mut slot = self.listing_page.lock().await;
        if let Some(page) = slot.as_ref() {
            return Ok(page.clone());
        }
        let page = self.new_page().await?;
        *slot = Some(page.clone());
        Ok(page)
    }
}

/// Poll until `ready.selector` is present or the timeout elapses
async fn wait_until_ready(page: &Page, ready: &ReadyCondition) -> bool {
    let deadline = Instant::now() + ready.timeout;
    loop {
        if page.find_element(ready.selector.as_str()).await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(ready.poll_interval).await;
    }
}

/// Navigate with a bound; `Ok(false)` means the navigation timed out
async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<bool, FetchFailure> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(_)) => Ok(true),
        Ok(Err(e)) => Err(FetchFailure::transport(url, e)),
        Err(_) => Ok(false),
    }
}

#[async_trait]
impl BrowsingSession for ChromiumBrowsingSession {
    async fn load_listing(
        &self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<ListingDocument, FetchFailure> {
        let page = self.listing_page().await?;
        let completed = navigate(&page, url, timeout).await?;
        if !completed {
            warn!("⚠️ Timeout loading listing page {}", url);
        }

        if !wait_until_ready(&page, ready).await {
            debug!("Listing cards did not appear within {:?}", ready.timeout);
        }

        let html = page.content().await.map_err(FetchFailure::browser)?;
        Ok(if completed {
            ListingDocument::complete(html)
        } else {
            ListingDocument::partial(html)
        })
    }

    async fn open_context(&self) -> Result<Box<dyn DocumentContext>, FetchFailure> {
        let page = self.new_page().await?;
        Ok(Box::new(ChromiumDocumentContext::new(page)))
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(page) = self.listing_page.lock().await.take() {
            if let Err(e) = page.close().await {
                warn!("Failed to close listing page: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.lock().await.take() {
            browser.close().await?;
            browser.wait().await?;
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        info!("Headless browser closed");
        Ok(())
    }
}

/// Detail tab, closed on every exit path
pub struct ChromiumDocumentContext {
    page: Option<Page>,
    runtime_handle: tokio::runtime::Handle,
}

impl ChromiumDocumentContext {
    fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }
}

#[async_trait]
impl DocumentContext for ChromiumDocumentContext {
    async fn load(
        &mut self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<String, FetchFailure> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| FetchFailure::browser("document context already closed"))?;

        if !navigate(page, url, timeout).await? {
            return Err(FetchFailure::timeout(url, timeout));
        }
        if !wait_until_ready(page, ready).await {
            debug!("Detail body did not appear within {:?} for {}", ready.timeout, url);
        }
        page.content().await.map_err(FetchFailure::browser)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            page.close().await?;
        }
        Ok(())
    }
}

impl Drop for ChromiumDocumentContext {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.runtime_handle.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!("Detail tab cleanup failed: {}", e);
                }
            });
        }
    }
}
