//! Document loading errors
//!
//! Every variant is recoverable from the pipeline's point of view; the
//! message becomes the `reason` of a failure record.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("Timeout {}ms exceeded loading {url}", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("HTTP request failed with status {status}: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Browser error: {message}")]
    Browser { message: String },
}

impl FetchFailure {
    pub fn timeout(url: &str, after: Duration) -> Self {
        Self::Timeout {
            url: url.to_string(),
            after,
        }
    }

    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn browser(err: impl std::fmt::Display) -> Self {
        Self::Browser {
            message: err.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
