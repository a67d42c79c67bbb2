//! Detail page enrichment for a single product
//!
//! Each fetch opens its own [`DocumentContext`] and closes it before
//! returning, whatever the outcome. Contexts are never shared across items.

use std::time::Duration;
use tracing::{debug, warn};

use crate::infrastructure::browsing::{BrowsingSession, DocumentContext, ReadyCondition};
use crate::infrastructure::config::CrawlConfig;
use crate::infrastructure::fetch_error::FetchFailure;
use crate::infrastructure::parsing::{
    HtmlExtractor, ParsingResult, ProductDetailParser, ProductDetails, SelectorConfig,
};

pub struct DetailFetcher {
    parser: ProductDetailParser,
    timeout: Duration,
    ready: ReadyCondition,
}

impl DetailFetcher {
    pub fn new(selectors: &SelectorConfig, crawl: &CrawlConfig) -> ParsingResult<Self> {
        Ok(Self {
            parser: ProductDetailParser::new(&selectors.detail)?,
            timeout: crawl.detail_timeout(),
            ready: ReadyCondition::new(
                selectors.detail.description.clone(),
                crawl.detail_ready_timeout(),
                crawl.ready_poll_interval(),
            ),
        })
    }

    /// Load `url` in a fresh context and extract description and color
    pub async fn fetch<S>(&self, session: &S, url: &str) -> Result<ProductDetails, FetchFailure>
    where
        S: BrowsingSession + ?Sized,
    {
        let mut context = session.open_context().await?;
        let loaded = context.load(url, self.timeout, &self.ready).await;
        release(context.as_mut(), url).await;

        let html = loaded?;
        let details = self.parser.parse_str(&html);
        debug!(
            url,
            has_description = !details.description.is_empty(),
            color = %details.color,
            "Detail extracted"
        );
        Ok(details)
    }
}

async fn release(context: &mut dyn DocumentContext, url: &str) {
    if let Err(e) = context.close().await {
        warn!(url, "Failed to close detail context: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browsing::ListingDocument;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DETAIL: &str = r#"
        <div class="grid gap-4"><p>Lett løpesko</p></div>
        <p class="typo-subtitle-1 mb-1">Farge: 010-svart</p>
    "#;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    struct OneShotSession {
        outcome: Result<String, FetchFailure>,
        counters: Arc<Counters>,
    }

    struct OneShotContext {
        outcome: Result<String, FetchFailure>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl BrowsingSession for OneShotSession {
        async fn load_listing(
            &self,
            _url: &str,
            _timeout: Duration,
            _ready: &ReadyCondition,
        ) -> Result<ListingDocument, FetchFailure> {
            Ok(ListingDocument::complete(""))
        }

        async fn open_context(&self) -> Result<Box<dyn DocumentContext>, FetchFailure> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(OneShotContext {
                outcome: self.outcome.clone(),
                counters: Arc::clone(&self.counters),
            }))
        }

        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentContext for OneShotContext {
        async fn load(
            &mut self,
            _url: &str,
            _timeout: Duration,
            _ready: &ReadyCondition,
        ) -> Result<String, FetchFailure> {
            self.outcome.clone()
        }

        async fn close(&mut self) -> anyhow::Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fetcher() -> DetailFetcher {
        DetailFetcher::new(&SelectorConfig::default(), &CrawlConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn successful_fetch_extracts_and_closes_context() {
        let counters = Arc::new(Counters::default());
        let session = OneShotSession {
            outcome: Ok(DETAIL.to_string()),
            counters: Arc::clone(&counters),
        };

        let details = fetcher().fetch(&session, "https://www.sport1.no/sko/x").await.unwrap();

        assert_eq!(details.description, "Lett løpesko");
        assert_eq!(details.color, "Svart");
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_is_reported_and_context_still_closed() {
        let url = "https://www.sport1.no/sko/y";
        let counters = Arc::new(Counters::default());
        let session = OneShotSession {
            outcome: Err(FetchFailure::timeout(url, Duration::from_secs(10))),
            counters: Arc::clone(&counters),
        };

        let err = fetcher().fetch(&session, url).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn page_without_detail_nodes_yields_empty_fields() {
        let session = OneShotSession {
            outcome: Ok("<html><body></body></html>".to_string()),
            counters: Arc::new(Counters::default()),
        };

        let details = fetcher().fetch(&session, "https://www.sport1.no/sko/z").await.unwrap();
        assert_eq!(details, ProductDetails::default());
    }
}
