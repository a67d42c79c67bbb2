//! Parsing error types
//!
//! Extraction itself never fails; missing structure degrades to empty or
//! null fields. These errors only arise while compiling the extractors from
//! configuration.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid base URL: {url} - {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ParsingError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
