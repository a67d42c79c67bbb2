//! Product detail page extraction
//!
//! Description and color are both optional on the page; absence yields an
//! empty string rather than an error.

use scraper::{Html, Selector};
use tracing::debug;

use super::config::DetailSelectors;
use super::error::ParsingResult;
use super::fields::parse_color;
use super::{HtmlExtractor, compile_selector, element_text};

/// Enrichment data read from a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetails {
    pub description: String,
    pub color: String,
}

pub struct ProductDetailParser {
    description: Selector,
    color_label: Selector,
}

impl ProductDetailParser {
    pub fn new(selectors: &DetailSelectors) -> ParsingResult<Self> {
        Ok(Self {
            description: compile_selector(&selectors.description)?,
            color_label: compile_selector(&selectors.color_label)?,
        })
    }
}

impl HtmlExtractor for ProductDetailParser {
    type Output = ProductDetails;

    fn extract(&self, document: &Html) -> Self::Output {
        let description = document
            .select(&self.description)
            .next()
            .map(|e| element_text(&e))
            .unwrap_or_default();
        if description.is_empty() {
            debug!("No description found");
        }

        let color = document
            .select(&self.color_label)
            .next()
            .map(|e| parse_color(&element_text(&e)))
            .unwrap_or_default();
        if color.is_empty() {
            debug!("No color found");
        }

        ProductDetails { description, color }
    }
}
