// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        if !in_memory {
            let db_path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let db_path = db_path.split('?').next().unwrap_or(db_path);

            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create database directory {parent:?}"))?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        // Every in-memory connection is its own database, keep exactly one
        // and never let the pool recycle it
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {database_url}"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_products_sql = r"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                brand TEXT NOT NULL,
                image TEXT NOT NULL DEFAULT '',
                price INTEGER,
                description TEXT NOT NULL DEFAULT '',
                gender TEXT NOT NULL DEFAULT 'unisex',
                color TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                has_error BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (brand, name, gender, color)
            )
        ";

        let create_indexes_sql = r"
            CREATE INDEX IF NOT EXISTS idx_products_identity ON products (name, brand, gender);
            CREATE INDEX IF NOT EXISTS idx_products_gender_price ON products (gender, price);
        ";

        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::raw_sql(create_indexes_sql).execute(&self.pool).await?;

        info!("Database schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
