//! HTML field extraction for listing and detail pages
//!
//! Extraction is a pure function of page content. Selectors are compiled
//! once from configuration; a bad selector is reported then, never during a
//! crawl.

pub mod config;
pub mod error;
pub mod fields;
pub mod product_detail_parser;
pub mod product_list_parser;

pub use config::{DetailSelectors, ListingSelectors, SelectorConfig};
pub use error::{ParsingError, ParsingResult};
pub use product_detail_parser::{ProductDetailParser, ProductDetails};
pub use product_list_parser::{ListingEntry, ProductListParser};

use scraper::{ElementRef, Html, Selector};

/// Extracts a typed value from a parsed document
pub trait HtmlExtractor {
    type Output;

    fn extract(&self, document: &Html) -> Self::Output;

    /// Parse raw HTML and extract from it
    fn parse_str(&self, html: &str) -> Self::Output {
        self.extract(&Html::parse_document(html))
    }
}

pub(crate) fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

/// Trimmed text content of an element
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
