//! Infrastructure layer for configuration, logging, document loading,
//! HTML parsing and the SQLite product store.

pub mod browsing;
pub mod config;
pub mod database_connection;
pub mod fetch_error;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod product_repository;

#[cfg(feature = "browser")]
pub mod browser_session;

pub use browsing::{BrowsingSession, DocumentContext, ListingDocument, ReadyCondition};
pub use config::{AppConfig, ConfigManager, CrawlConfig, SiteConfig, StorageConfig};
pub use database_connection::DatabaseConnection;
pub use fetch_error::FetchFailure;
pub use http_client::{HttpBrowsingSession, HttpClientConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{
    HtmlExtractor, ListingEntry, ParsingError, ParsingResult, ProductDetailParser, ProductDetails,
    ProductListParser, SelectorConfig,
};
pub use product_repository::SqliteProductRepository;

#[cfg(feature = "browser")]
pub use browser_session::ChromiumBrowsingSession;
