//! SQLite implementation of the product catalog store
//!
//! Conflict resolution is keyed on (brand, name, gender, color): an incoming
//! record replaces every non-key column of an existing row, last write wins.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::domain::{CatalogQuery, Gender, PriceOrder, ProductRecord, ProductStore};

const UPSERT_SQL: &str = r"
    INSERT INTO products
        (name, brand, image, price, description, gender, color, url, has_error, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (brand, name, gender, color) DO UPDATE SET
        image = excluded.image,
        price = excluded.price,
        description = excluded.description,
        url = excluded.url,
        has_error = excluded.has_error,
        updated_at = excluded.updated_at
";

const SELECT_COLUMNS: &str =
    "SELECT name, brand, image, price, description, gender, color, url, has_error FROM products";

#[derive(Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert_in(tx: &mut Transaction<'_, Sqlite>, record: &ProductRecord) -> Result<()> {
        let now = Utc::now();
        sqlx::query(UPSERT_SQL)
            .bind(&record.name)
            .bind(&record.brand)
            .bind(&record.image)
            .bind(record.price)
            .bind(&record.description)
            .bind(record.gender.as_str())
            .bind(&record.color)
            .bind(&record.url)
            .bind(record.has_error)
            .bind(now)
            .bind(now)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to upsert {} {}", record.brand, record.name))?;
        Ok(())
    }

    fn record_from_row(row: &SqliteRow) -> Result<ProductRecord> {
        let gender: String = row.try_get("gender")?;
        let gender = gender.parse::<Gender>().unwrap_or_else(|e| {
            warn!("{}; treating row as unisex", e);
            Gender::Unisex
        });

        Ok(ProductRecord {
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            image: row.try_get("image")?,
            price: row.try_get("price")?,
            description: row.try_get("description")?,
            gender,
            color: row.try_get("color")?,
            url: row.try_get("url")?,
            has_error: row.try_get("has_error")?,
        })
    }
}

#[async_trait]
impl ProductStore for SqliteProductRepository {
    async fn exists_by(&self, name: &str, brand: &str, gender: Gender) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE name = ? AND brand = ? AND gender = ?",
        )
        .bind(name)
        .bind(brand)
        .bind(gender.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check for existing product")?;

        Ok(count > 0)
    }

    async fn upsert_batch(&self, records: &[ProductRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        for record in records {
            Self::upsert_in(&mut tx, record).await?;
        }
        tx.commit().await.context("Failed to commit batch transaction")?;

        debug!("Upserted batch of {} products", records.len());
        Ok(records.len())
    }

    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ProductRecord>> {
        let direction = match query.order {
            PriceOrder::Asc => "ASC",
            PriceOrder::Desc => "DESC",
        };
        let filter = if query.gender.is_some() { " WHERE gender = ?" } else { "" };
        let sql = format!("{SELECT_COLUMNS}{filter} ORDER BY price IS NULL, price {direction}, id ASC");

        let mut statement = sqlx::query(&sql);
        if let Some(gender) = query.gender {
            statement = statement.bind(gender.as_str());
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .context("Failed to query products")?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn upsert_one(&self, record: &ProductRecord) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Self::upsert_in(&mut tx, record).await?;
        tx.commit().await.context("Failed to commit correction")?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;

    async fn repository() -> Result<SqliteProductRepository> {
        let db = DatabaseConnection::new("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(SqliteProductRepository::new(db.pool().clone()))
    }

    fn record(name: &str, gender: Gender, color: &str, price: Option<i64>) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            brand: "Nike".to_string(),
            image: "https://cdn.sport1.no/img.jpg".to_string(),
            price,
            description: "Lett løpesko".to_string(),
            gender,
            color: color.to_string(),
            url: format!("https://www.sport1.no/sko/{name}"),
            has_error: false,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_rows_with_same_natural_key() -> Result<()> {
        let repo = repository().await?;
        repo.upsert_batch(&[record("Pegasus", Gender::Herre, "Svart", Some(1599))]).await?;

        let mut changed = record("Pegasus", Gender::Herre, "Svart", Some(1299));
        changed.description = String::new();
        changed.has_error = true;
        repo.upsert_batch(&[changed.clone()]).await?;

        assert_eq!(repo.count().await?, 1);
        let rows = repo.query(&CatalogQuery::default()).await?;
        assert_eq!(rows, vec![changed]);
        Ok(())
    }

    #[tokio::test]
    async fn color_is_part_of_the_conflict_key() -> Result<()> {
        let repo = repository().await?;
        let written = repo
            .upsert_batch(&[
                record("Pegasus", Gender::Herre, "Svart", Some(1599)),
                record("Pegasus", Gender::Herre, "Hvit", Some(1599)),
            ])
            .await?;

        assert_eq!(written, 2);
        assert_eq!(repo.count().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn exists_by_ignores_color() -> Result<()> {
        let repo = repository().await?;
        repo.upsert_one(&record("Pegasus", Gender::Herre, "Svart", Some(1599))).await?;

        assert!(repo.exists_by("Pegasus", "Nike", Gender::Herre).await?);
        assert!(!repo.exists_by("Pegasus", "Nike", Gender::Dame).await?);
        assert!(!repo.exists_by("Pegasus", "Adidas", Gender::Herre).await?);
        Ok(())
    }

    #[tokio::test]
    async fn query_filters_by_gender_and_sorts_nulls_last() -> Result<()> {
        let repo = repository().await?;
        repo.upsert_batch(&[
            record("A", Gender::Dame, "", Some(900)),
            record("B", Gender::Dame, "", None),
            record("C", Gender::Dame, "", Some(1500)),
            record("D", Gender::Herre, "", Some(2000)),
        ])
        .await?;

        let asc = repo
            .query(&CatalogQuery::new(Some(Gender::Dame), PriceOrder::Asc))
            .await?;
        let names: Vec<_> = asc.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["A", "C", "B"]);

        let desc = repo.query(&CatalogQuery::new(None, PriceOrder::Desc)).await?;
        let names: Vec<_> = desc.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["D", "C", "A", "B"]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() -> Result<()> {
        let repo = repository().await?;
        assert_eq!(repo.upsert_batch(&[]).await?, 0);
        assert_eq!(repo.count().await?, 0);
        Ok(())
    }
}
