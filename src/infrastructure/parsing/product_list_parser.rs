//! Listing page extraction
//!
//! Reads summary product cards from a listing document. Every card yields an
//! entry; missing sub-nodes degrade to empty strings or a null price.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::config::ListingSelectors;
use super::error::{ParsingError, ParsingResult};
use super::fields::parse_price;
use super::{HtmlExtractor, compile_selector, element_text};

/// Raw listing card, before gender inference and enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub brand: String,
    pub name: String,
    pub price: Option<i64>,
    pub image: String,
    /// Relative link to the detail page, as found in the markup
    pub href: String,
}

pub struct ProductListParser {
    card: Selector,
    subtitle: Selector,
    price: Selector,
    image: Selector,
    base_url: Url,
}

impl ProductListParser {
    pub fn new(selectors: &ListingSelectors, base_url: &str) -> ParsingResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ParsingError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            card: compile_selector(&selectors.card)?,
            subtitle: compile_selector(&selectors.subtitle)?,
            price: compile_selector(&selectors.price)?,
            image: compile_selector(&selectors.image)?,
            base_url,
        })
    }

    fn extract_entry(&self, card: &ElementRef<'_>) -> ListingEntry {
        let mut subtitles = card.select(&self.subtitle).map(|e| element_text(&e));
        let brand = subtitles.next().unwrap_or_default();
        let name = subtitles.next().unwrap_or_default();

        let price = card
            .select(&self.price)
            .next()
            .and_then(|e| parse_price(&e.text().collect::<String>()));

        let image = card
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .map(|src| self.resolve_image(src))
            .unwrap_or_default();

        let href = card.value().attr("href").unwrap_or_default().trim().to_string();

        ListingEntry {
            brand,
            name,
            price,
            image,
            href,
        }
    }

    fn resolve_image(&self, src: &str) -> String {
        let src = src.trim();
        if src.is_empty() {
            return String::new();
        }
        self.base_url
            .join(src)
            .map_or_else(|_| src.to_string(), |u| u.to_string())
    }
}

impl HtmlExtractor for ProductListParser {
    type Output = Vec<ListingEntry>;

    fn extract(&self, document: &Html) -> Self::Output {
        let entries: Vec<ListingEntry> = document
            .select(&self.card)
            .map(|card| self.extract_entry(&card))
            .collect();

        debug!("Extracted {} listing entries", entries.len());
        entries
    }
}
