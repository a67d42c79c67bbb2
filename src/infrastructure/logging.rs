//! Logging system configuration and initialization
//!
//! - Console and/or file output, file writes go through a non-blocking writer
//! - Configuration based log level, overridable with `RUST_LOG`
//! - Structured JSON logging (optional)
//! - Local-time timestamps

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::ConfigManager;

// Keeps the file writer alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Local time formatter with millisecond precision
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Resolve the log directory, `<data dir>/logs` unless configured
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config
        .log_dir
        .clone()
        .unwrap_or_else(|| ConfigManager::app_data_dir().join("logs"))
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level with
/// noisy dependencies held back unless tracing everything
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for directive in [
            "sqlx::query=warn",
            "sqlx::sqlite=warn",
            "reqwest=info",
            "hyper=warn",
            "hyper_util=warn",
            "h2=warn",
            "chromiumoxide=warn",
            "tungstenite=warn",
        ] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// ```bash
/// # Show SQL statements while debugging
/// RUST_LOG="debug,sqlx::query=debug" shoe-catalog ingest
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
            .boxed()
    });

    let mut log_dir = None;
    let file_layer = if config.file_output {
        let dir = get_log_directory(config);
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", dir, e))?;

        let (file_writer, file_guard) = non_blocking(rolling::never(&dir, &config.file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);
        log_dir = Some(dir);

        let layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        Some(if config.json_format {
            layer.json().with_target(true).with_file(true).with_line_number(true).boxed()
        } else {
            layer.with_target(false).boxed()
        })
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if let Some(dir) = log_dir {
        info!("Log directory: {:?}", dir);
    }
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Shoe Catalog System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("========================================");
}
