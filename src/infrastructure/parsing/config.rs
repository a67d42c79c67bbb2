//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors so a markup change is a configuration change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
}

/// CSS selectors for listing pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Product card; the card itself is the link carrying the href
    pub card: String,

    /// Subtitle node, first occurrence is the brand, second the name
    pub subtitle: String,

    pub price: String,

    pub image: String,
}

/// CSS selectors for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    pub description: String,

    /// Node holding the `Farge: ...` label
    pub color_label: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            card: "a.flex.flex-1.flex-col".to_string(),
            subtitle: "p.typo-subtitle-2".to_string(),
            price: "p.typo-subtitle-1".to_string(),
            image: "img".to_string(),
        }
    }
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            description: "div.grid.gap-4 p".to_string(),
            color_label: "p.typo-subtitle-1.mb-1".to_string(),
        }
    }
}
