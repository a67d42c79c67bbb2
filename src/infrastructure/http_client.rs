//! HTTP browsing session for server-rendered pages
//!
//! Rate-limited reqwest client shared by the listing session and every detail
//! context. Readiness is checked once against the fetched markup, there is
//! nothing to poll for in a static response.

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT},
};
use scraper::{Html, Selector};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use anyhow::{Context, Result};

use super::browsing::{BrowsingSession, DocumentContext, ListingDocument, ReadyCondition};
use super::config::SiteConfig;
use super::fetch_error::FetchFailure;

/// HTTP client configuration for crawling
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub max_requests_per_second: u32,
}

impl From<&SiteConfig> for HttpClientConfig {
    fn from(site: &SiteConfig) -> Self {
        Self {
            user_agent: site.user_agent.clone(),
            max_requests_per_second: site.max_requests_per_second,
        }
    }
}

struct HttpClientInner {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClientInner {
    /// Fetch a URL as text, bounded by `timeout` including the body read
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchFailure> {
        self.rate_limiter.until_ready().await;

        debug!("Fetching URL: {}", url);

        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| map_reqwest_error(url, timeout, &e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchFailure::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response
                .text()
                .await
                .map_err(|e| map_reqwest_error(url, timeout, &e))
        };

        let text = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchFailure::timeout(url, timeout))??;

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::timeout(url, timeout)
    } else {
        FetchFailure::transport(url, err)
    }
}

/// True when `selector` matches something in `html`; an unparsable selector
/// counts as ready so a bad readiness hint never blocks a load
fn markup_is_ready(html: &str, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(selector) => Html::parse_document(html).select(&selector).next().is_some(),
        Err(_) => true,
    }
}

/// Rate-limited HTTP implementation of [`BrowsingSession`]
pub struct HttpBrowsingSession {
    inner: Arc<HttpClientInner>,
    config: HttpClientConfig,
    open_contexts: Arc<AtomicUsize>,
}

impl HttpBrowsingSession {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("nb-NO,nb;q=0.9,no;q=0.8"));

        let client = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            inner: Arc::new(HttpClientInner {
                client,
                rate_limiter: RateLimiter::direct(quota),
            }),
            config,
            open_contexts: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Detail contexts currently open
    pub fn open_contexts(&self) -> usize {
        self.open_contexts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowsingSession for HttpBrowsingSession {
    async fn load_listing(
        &self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<ListingDocument, FetchFailure> {
        let html = self.inner.fetch_text(url, timeout).await?;
        if !markup_is_ready(&html, &ready.selector) {
            debug!("Listing {} has no '{}' in its markup", url, ready.selector);
        }
        Ok(ListingDocument::complete(html))
    }

    async fn open_context(&self) -> Result<Box<dyn DocumentContext>, FetchFailure> {
        self.open_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HttpDocumentContext {
            inner: Arc::clone(&self.inner),
            open_contexts: Arc::clone(&self.open_contexts),
            closed: false,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        info!("HTTP browsing session closed");
        Ok(())
    }
}

/// Detail context over the shared client; holds no connection of its own
pub struct HttpDocumentContext {
    inner: Arc<HttpClientInner>,
    open_contexts: Arc<AtomicUsize>,
    closed: bool,
}

impl HttpDocumentContext {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_contexts.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DocumentContext for HttpDocumentContext {
    async fn load(
        &mut self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<String, FetchFailure> {
        if self.closed {
            return Err(FetchFailure::browser("document context already closed"));
        }
        let html = self.inner.fetch_text(url, timeout).await?;
        if !markup_is_ready(&html, &ready.selector) {
            debug!("Detail {} has no '{}' in its markup", url, ready.selector);
        }
        Ok(html)
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for HttpDocumentContext {
    fn drop(&mut self) {
        self.release();
    }
}
