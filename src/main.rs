use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shoe_catalog_lib::application::IngestionPipeline;
use shoe_catalog_lib::domain::{CatalogQuery, Gender, PriceOrder, ProductRecord, ProductStore};
use shoe_catalog_lib::infrastructure::config::{AppConfig, ConfigManager};
use shoe_catalog_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use shoe_catalog_lib::infrastructure::{
    BrowsingSession, DatabaseConnection, HttpBrowsingSession, HttpClientConfig,
    SqliteProductRepository,
};

#[derive(Debug, Parser)]
#[command(
    name = "shoe-catalog",
    version,
    about = "Ingest a retailer's shoe listing into a local catalog"
)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl the listing and upsert every page into the catalog
    Ingest {
        #[arg(long, value_name = "N")]
        max_pages: Option<u32>,

        /// Stop at the first listing page without entries
        #[arg(long, default_value_t = false)]
        stop_on_empty_page: bool,

        /// Drive a headless Chromium instead of plain HTTP
        #[cfg(feature = "browser")]
        #[arg(long, default_value_t = false)]
        browser: bool,
    },

    /// Print the catalog, optionally filtered by gender
    List {
        /// herre, dame, barn, junior, unisex, alle, or `all` for no filter
        #[arg(long, default_value = "all")]
        gender: String,

        #[arg(long, default_value = "desc", value_parser = parse_order)]
        order: PriceOrder,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Apply a single JSON product record as a correction
    Correct {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn parse_order(value: &str) -> Result<PriceOrder, String> {
    value.parse()
}

fn parse_gender_filter(value: &str) -> Result<Option<Gender>> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(value.parse::<Gender>()?))
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = ConfigManager::new(cli.config.clone()).load()?;

    if let Some(url) = &cli.database_url {
        config.storage.database_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Command::Ingest {
        max_pages,
        stop_on_empty_page,
        ..
    } = &cli.command
    {
        if let Some(max_pages) = max_pages {
            config.crawl.max_pages = *max_pages;
        }
        if *stop_on_empty_page {
            config.crawl.stop_on_empty_page = true;
        }
    }

    config.validate()?;
    Ok(config)
}

async fn open_store(config: &AppConfig) -> Result<(DatabaseConnection, Arc<SqliteProductRepository>)> {
    let db = DatabaseConnection::new(&config.storage.database_url, config.storage.max_connections).await?;
    db.migrate().await?;
    let repo = Arc::new(SqliteProductRepository::new(db.pool().clone()));
    Ok((db, repo))
}

/// Cancel the run on Ctrl-C; the current page is still flushed
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing the current page");
            child.cancel();
        }
    });
    token
}

async fn run_ingest<S: BrowsingSession>(
    session: S,
    store: Arc<SqliteProductRepository>,
    config: &AppConfig,
) -> Result<()> {
    let pipeline = IngestionPipeline::new(session, Arc::clone(&store), config)?;
    let cancel = cancel_on_ctrl_c();
    let summary = pipeline.run(&cancel).await;

    let total = store.count().await?;
    info!(
        clean = summary.is_clean(),
        "Catalog now holds {} products",
        total
    );
    Ok(())
}

async fn ingest(config: &AppConfig, use_browser: bool) -> Result<()> {
    let (db, store) = open_store(config).await?;

    if use_browser {
        #[cfg(feature = "browser")]
        {
            let session = shoe_catalog_lib::infrastructure::ChromiumBrowsingSession::launch(
                &config.site.user_agent,
            )
            .await?;
            run_ingest(session, store, config).await?;
        }
    } else {
        let session = HttpBrowsingSession::new(HttpClientConfig::from(&config.site))?;
        run_ingest(session, store, config).await?;
    }

    db.close().await;
    Ok(())
}

async fn list(config: &AppConfig, query: CatalogQuery, json: bool) -> Result<()> {
    let (db, store) = open_store(config).await?;
    let products = store.query(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
    } else {
        for p in &products {
            let price = p.price.map_or_else(|| "-".to_string(), |price| format!("{price},-"));
            let flag = if p.has_error { " (incomplete)" } else { "" };
            println!(
                "{:>8}  {:<7} {} {} [{}]{}",
                price, p.gender, p.brand, p.name, p.color, flag
            );
        }
        println!("{} products", products.len());
    }

    db.close().await;
    Ok(())
}

async fn correct(config: &AppConfig, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read correction file {file:?}"))?;
    let record: ProductRecord =
        serde_json::from_str(&raw).context("Correction file is not a valid product record")?;
    if record.name.trim().is_empty() || record.brand.trim().is_empty() {
        bail!("Correction record needs both name and brand");
    }

    let (db, store) = open_store(config).await?;
    store.upsert_one(&record).await?;
    info!(
        brand = %record.brand,
        name = %record.name,
        gender = %record.gender,
        color = %record.color,
        "Correction applied"
    );

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging_with_config(&config.logging)?;
    log_system_info();

    match cli.command {
        Command::Ingest {
            #[cfg(feature = "browser")]
            browser,
            ..
        } => {
            #[cfg(not(feature = "browser"))]
            let browser = false;
            ingest(&config, browser).await
        }
        Command::List {
            gender,
            order,
            json,
        } => {
            let query = CatalogQuery::new(parse_gender_filter(&gender)?, order);
            list(&config, query, json).await
        }
        Command::Correct { file } => correct(&config, &file).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gender_filter_accepts_all_and_known_slugs() {
        assert_eq!(parse_gender_filter("all").unwrap(), None);
        assert_eq!(parse_gender_filter("Dame").unwrap(), Some(Gender::Dame));
        assert_eq!(parse_gender_filter("alle").unwrap(), Some(Gender::Alle));
        assert!(parse_gender_filter("kids").is_err());
    }

    #[test]
    fn ingest_flags_override_configuration() {
        let cli = Cli::parse_from([
            "shoe-catalog",
            "--database-url",
            "sqlite::memory:",
            "ingest",
            "--max-pages",
            "3",
            "--stop-on-empty-page",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.crawl.max_pages, 3);
        assert!(config.crawl.stop_on_empty_page);
        assert_eq!(config.storage.database_url, "sqlite::memory:");
    }
}
