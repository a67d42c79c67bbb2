//! Browsing session abstraction
//!
//! A session is long-lived and reused for every listing page. Detail pages are
//! loaded through a short-lived [`DocumentContext`] that is owned by exactly
//! one detail fetch and closed before the next item is attempted.

use async_trait::async_trait;
use std::time::Duration;

use super::fetch_error::FetchFailure;

/// Bounded wait for a structural element to appear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyCondition {
    pub selector: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ReadyCondition {
    pub fn new(selector: impl Into<String>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            selector: selector.into(),
            timeout,
            poll_interval,
        }
    }
}

/// A loaded listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDocument {
    pub html: String,
    /// False when navigation timed out and `html` is whatever had loaded
    pub complete: bool,
}

impl ListingDocument {
    pub fn complete(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            complete: true,
        }
    }

    pub fn partial(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            complete: false,
        }
    }
}

#[async_trait]
pub trait BrowsingSession: Send + Sync {
    /// Load a listing page, bounded by `timeout`, then wait for `ready`
    async fn load_listing(
        &self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<ListingDocument, FetchFailure>;

    /// Open a transient context for one detail fetch
    async fn open_context(&self) -> Result<Box<dyn DocumentContext>, FetchFailure>;

    /// Release the session and everything it owns
    async fn shutdown(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait DocumentContext: Send {
    /// Load a document, bounded by `timeout`, then wait for `ready`
    async fn load(
        &mut self,
        url: &str,
        timeout: Duration,
        ready: &ReadyCondition,
    ) -> Result<String, FetchFailure>;

    /// Release the context; calling it twice is a no-op
    async fn close(&mut self) -> anyhow::Result<()>;
}
