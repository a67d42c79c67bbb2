//! Configuration infrastructure
//!
//! Settings are layered, lowest precedence first:
//! 1. Compiled defaults (`AppConfig::default()`, see [`defaults`])
//! 2. Optional config file passed with `--config` (TOML, JSON or YAML)
//! 3. Environment variables prefixed `SHOE_CATALOG`, nested with `__`
//!    (e.g. `SHOE_CATALOG__CRAWL__MAX_PAGES=5`)
//!
//! CLI flags are applied on top by the binary.

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::parsing::config::SelectorConfig;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SHOE_CATALOG";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub selectors: SelectorConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Retailer endpoints and request etiquette
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host, detail hrefs are appended to this
    pub base_url: String,

    /// Path of the paginated listing
    pub listing_path: String,

    /// Availability filter appended to every listing query
    pub availability_filter: String,

    /// Listing sort parameter
    pub sort: String,

    pub user_agent: String,

    pub max_requests_per_second: u32,
}

/// Crawl bounds and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Page ceiling; pages `1..=max_pages` are visited
    pub max_pages: u32,

    pub listing_timeout_ms: u64,

    pub detail_timeout_ms: u64,

    /// Upper bound on waiting for the listing cards to render
    pub listing_ready_timeout_ms: u64,

    /// Upper bound on waiting for the detail body to render
    pub detail_ready_timeout_ms: u64,

    pub ready_poll_interval_ms: u64,

    /// Stop at the first listing page that yields no entries
    pub stop_on_empty_page: bool,
}

/// Durable store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to `<data dir>/logs`
    pub log_dir: Option<PathBuf>,

    pub file_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: sport1::BASE_URL.to_string(),
            listing_path: sport1::LISTING_PATH.to_string(),
            availability_filter: sport1::AVAILABILITY_FILTER.to_string(),
            sort: sport1::SORT.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::MAX_PAGES,
            listing_timeout_ms: defaults::LISTING_TIMEOUT_MS,
            detail_timeout_ms: defaults::DETAIL_TIMEOUT_MS,
            listing_ready_timeout_ms: defaults::LISTING_READY_TIMEOUT_MS,
            detail_ready_timeout_ms: defaults::DETAIL_READY_TIMEOUT_MS,
            ready_poll_interval_ms: defaults::READY_POLL_INTERVAL_MS,
            stop_on_empty_page: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

impl SiteConfig {
    /// `{base}{listing_path}?page={page}&{availability-filter}&sort={sort}`
    pub fn listing_url(&self, page: u32) -> String {
        let mut url = format!(
            "{}{}?page={}",
            self.base_url.trim_end_matches('/'),
            self.listing_path,
            page
        );
        if !self.availability_filter.is_empty() {
            url.push('&');
            url.push_str(&self.availability_filter);
        }
        if !self.sort.is_empty() {
            url.push_str("&sort=");
            url.push_str(&self.sort);
        }
        url
    }

    /// Resolve a listing href to an absolute detail URL
    pub fn detail_url(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), href)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), href)
        }
    }
}

impl CrawlConfig {
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }

    pub fn listing_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_ready_timeout_ms)
    }

    pub fn detail_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_ready_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.crawl.max_pages == 0 {
            bail!("crawl.max_pages must be at least 1");
        }
        if self.crawl.listing_timeout_ms == 0 || self.crawl.detail_timeout_ms == 0 {
            bail!("crawl timeouts must be greater than 0");
        }
        if self.crawl.ready_poll_interval_ms == 0 {
            bail!("crawl.ready_poll_interval_ms must be greater than 0");
        }
        if self.site.max_requests_per_second == 0 {
            bail!("site.max_requests_per_second must be at least 1");
        }
        url::Url::parse(&self.site.base_url)
            .with_context(|| format!("site.base_url is not a valid URL: {}", self.site.base_url))?;
        if self.storage.max_connections == 0 {
            bail!("storage.max_connections must be at least 1");
        }
        Ok(())
    }
}

/// Loads the layered configuration
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &self.config_path {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;

        match &self.config_path {
            Some(path) => info!("Loaded configuration (file: {:?})", path),
            None => info!("Loaded configuration from defaults and environment"),
        }
        Ok(config)
    }

    /// Application data directory, `<data-local>/shoe-catalog`
    pub fn app_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
            .join("shoe-catalog")
    }
}

fn default_database_url() -> String {
    let path = ConfigManager::app_data_dir().join("database").join("catalog.db");
    format!("sqlite:{}", path.display())
}

/// Sport 1 retailer constants
pub mod sport1 {
    /// Base URL of the retailer
    pub const BASE_URL: &str = "https://www.sport1.no";

    /// Paginated shoe listing
    pub const LISTING_PATH: &str = "/sko";

    /// Restrict the listing to the Melhus store's stock
    pub const AVAILABILITY_FILTER: &str = "InStockWarehouseIds=11340";

    pub const SORT: &str = "PriceDescending";
}

/// Default configuration values
pub mod defaults {
    /// Default page ceiling
    pub const MAX_PAGES: u32 = 50;

    /// Listing navigation timeout
    pub const LISTING_TIMEOUT_MS: u64 = 10_000;

    /// Detail navigation timeout
    pub const DETAIL_TIMEOUT_MS: u64 = 10_000;

    /// Listing cards are client-rendered, allow them time to appear
    pub const LISTING_READY_TIMEOUT_MS: u64 = 3_000;

    pub const DETAIL_READY_TIMEOUT_MS: u64 = 1_000;

    pub const READY_POLL_INTERVAL_MS: u64 = 250;

    pub const MAX_REQUESTS_PER_SECOND: u32 = 4;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    pub const DB_MAX_CONNECTIONS: u32 = 5;

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAME: &str = "shoe-catalog.log";
}
