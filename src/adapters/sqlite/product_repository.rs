//! SQLite implementation of [`ProductRepository`] and [`MonitoringConfigRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{MonitoringConfig, MonitoringFrequency, Product};
use crate::domain::ports::{MonitoringConfigRepository, ProductRepository};

use super::{parse_datetime, parse_decimal, parse_optional_datetime, parse_optional_decimal, parse_uuid};

#[derive(FromRow)]
struct ProductRow {
    id: String,
    url: String,
    retailer: String,
    title: String,
    currency: String,
    current_price: String,
    lowest_ever: String,
    highest_ever: String,
    is_available: bool,
    last_checked_at: Option<String>,
    created_at: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = DatabaseError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: parse_uuid(&row.id)?,
            url: row.url,
            retailer: row.retailer,
            title: row.title,
            currency: row.currency,
            current_price: parse_decimal(&row.current_price)?,
            lowest_ever: parse_decimal(&row.lowest_ever)?,
            highest_ever: parse_decimal(&row.highest_ever)?,
            is_available: row.is_available,
            last_checked_at: parse_optional_datetime(row.last_checked_at)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn insert(&self, product: &Product) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO products (id, url, retailer, title, currency, current_price, lowest_ever,
               highest_ever, is_available, last_checked_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(product.id.to_string())
        .bind(&product.url)
        .bind(&product.retailer)
        .bind(&product.title)
        .bind(&product.currency)
        .bind(product.current_price.to_string())
        .bind(product.lowest_ever.to_string())
        .bind(product.highest_ever.to_string())
        .bind(product.is_available)
        .bind(product.last_checked_at.map(|t| t.to_rfc3339()))
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        let row: Option<ProductRow> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(Product::try_from).transpose()
    }

    async fn update(&self, product: &Product) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"UPDATE products SET url = ?, retailer = ?, title = ?, currency = ?, current_price = ?,
               lowest_ever = ?, highest_ever = ?, is_available = ?, last_checked_at = ? WHERE id = ?"#,
        )
        .bind(&product.url)
        .bind(&product.retailer)
        .bind(&product.title)
        .bind(&product.currency)
        .bind(product.current_price.to_string())
        .bind(product.lowest_ever.to_string())
        .bind(product.highest_ever.to_string())
        .bind(product.is_available)
        .bind(product.last_checked_at.map(|t| t.to_rfc3339()))
        .bind(product.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count as u64)
    }
}

#[derive(FromRow)]
struct MonitoringConfigRow {
    id: String,
    product_id: String,
    frequency_kind: String,
    frequency_hours: Option<i64>,
    active: bool,
    take_screenshot: bool,
    notify_on_any_change: bool,
    price_threshold_absolute: Option<String>,
    price_threshold_pct: Option<String>,
    manual_priority_boost: String,
    priority_score: String,
    last_monitored: Option<String>,
    next_scheduled: Option<String>,
}

impl TryFrom<MonitoringConfigRow> for MonitoringConfig {
    type Error = DatabaseError;

    fn try_from(row: MonitoringConfigRow) -> Result<Self, Self::Error> {
        let frequency = match row.frequency_kind.as_str() {
            "high" => MonitoringFrequency::High,
            "normal" => MonitoringFrequency::Normal,
            "low" => MonitoringFrequency::Low,
            "custom" => MonitoringFrequency::Custom(row.frequency_hours.unwrap_or(12) as u32),
            other => return Err(DatabaseError::SerializationError(format!("unknown frequency kind: {other}"))),
        };
        Ok(MonitoringConfig {
            id: parse_uuid(&row.id)?,
            product_id: parse_uuid(&row.product_id)?,
            frequency,
            active: row.active,
            take_screenshot: row.take_screenshot,
            notify_on_any_change: row.notify_on_any_change,
            price_threshold_absolute: parse_optional_decimal(row.price_threshold_absolute)?,
            price_threshold_pct: parse_optional_decimal(row.price_threshold_pct)?,
            manual_priority_boost: parse_decimal(&row.manual_priority_boost)?,
            priority_score: parse_decimal(&row.priority_score)?,
            last_monitored: parse_optional_datetime(row.last_monitored)?,
            next_scheduled: parse_optional_datetime(row.next_scheduled)?,
        })
    }
}

fn frequency_parts(frequency: MonitoringFrequency) -> (&'static str, Option<i64>) {
    match frequency {
        MonitoringFrequency::High => ("high", None),
        MonitoringFrequency::Normal => ("normal", None),
        MonitoringFrequency::Low => ("low", None),
        MonitoringFrequency::Custom(hours) => ("custom", Some(i64::from(hours))),
    }
}

#[derive(Clone)]
pub struct SqliteMonitoringConfigRepository {
    pool: SqlitePool,
}

impl SqliteMonitoringConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitoringConfigRepository for SqliteMonitoringConfigRepository {
    async fn insert(&self, config: &MonitoringConfig) -> Result<(), DatabaseError> {
        let (kind, hours) = frequency_parts(config.frequency);
        sqlx::query(
            r#"INSERT INTO monitoring_configs (id, product_id, frequency_kind, frequency_hours, active,
               take_screenshot, notify_on_any_change, price_threshold_absolute, price_threshold_pct,
               manual_priority_boost, priority_score, last_monitored, next_scheduled)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(config.id.to_string())
        .bind(config.product_id.to_string())
        .bind(kind)
        .bind(hours)
        .bind(config.active)
        .bind(config.take_screenshot)
        .bind(config.notify_on_any_change)
        .bind(config.price_threshold_absolute.map(|d| d.to_string()))
        .bind(config.price_threshold_pct.map(|d| d.to_string()))
        .bind(config.manual_priority_boost.to_string())
        .bind(config.priority_score.to_string())
        .bind(config.last_monitored.map(|t| t.to_rfc3339()))
        .bind(config.next_scheduled.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<MonitoringConfig>, DatabaseError> {
        let row: Option<MonitoringConfigRow> = sqlx::query_as("SELECT * FROM monitoring_configs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(MonitoringConfig::try_from).transpose()
    }

    async fn get_by_product(&self, product_id: Uuid) -> Result<Option<MonitoringConfig>, DatabaseError> {
        let row: Option<MonitoringConfigRow> =
            sqlx::query_as("SELECT * FROM monitoring_configs WHERE product_id = ?")
                .bind(product_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(MonitoringConfig::try_from).transpose()
    }

    async fn due(&self, now: DateTime<Utc>, batch_size: u32) -> Result<Vec<MonitoringConfig>, DatabaseError> {
        let rows: Vec<MonitoringConfigRow> = sqlx::query_as(
            r#"SELECT * FROM monitoring_configs WHERE active = 1 AND next_scheduled <= ?
               ORDER BY priority_score ASC, next_scheduled ASC LIMIT ?"#,
        )
        .bind(now.to_rfc3339())
        .bind(i64::from(batch_size))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(MonitoringConfig::try_from).collect()
    }

    async fn active(&self, batch_size: u32) -> Result<Vec<MonitoringConfig>, DatabaseError> {
        let rows: Vec<MonitoringConfigRow> =
            sqlx::query_as("SELECT * FROM monitoring_configs WHERE active = 1 LIMIT ?")
                .bind(i64::from(batch_size))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(MonitoringConfig::try_from).collect()
    }

    async fn update_schedule(&self, config: &MonitoringConfig) -> Result<(), DatabaseError> {
        let (kind, hours) = frequency_parts(config.frequency);
        let result = sqlx::query(
            r#"UPDATE monitoring_configs SET frequency_kind = ?, frequency_hours = ?, active = ?,
               take_screenshot = ?, notify_on_any_change = ?, price_threshold_absolute = ?,
               price_threshold_pct = ?, manual_priority_boost = ?, priority_score = ?, last_monitored = ?,
               next_scheduled = ? WHERE id = ?"#,
        )
        .bind(kind)
        .bind(hours)
        .bind(config.active)
        .bind(config.take_screenshot)
        .bind(config.notify_on_any_change)
        .bind(config.price_threshold_absolute.map(|d| d.to_string()))
        .bind(config.price_threshold_pct.map(|d| d.to_string()))
        .bind(config.manual_priority_boost.to_string())
        .bind(config.priority_score.to_string())
        .bind(config.last_monitored.map(|t| t.to_rfc3339()))
        .bind(config.next_scheduled.map(|t| t.to_rfc3339()))
        .bind(config.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM monitoring_configs WHERE active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn pool() -> SqlitePool {
        create_migrated_test_pool().await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let pool = pool().await;
        let repo = SqliteProductRepository::new(pool);
        let product = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
        repo.insert(&product).await.unwrap();
        let loaded = repo.get(product.id).await.unwrap().unwrap();
        assert_eq!(loaded, product);
    }

    #[tokio::test]
    async fn update_missing_row_errors() {
        let pool = pool().await;
        let repo = SqliteProductRepository::new(pool);
        let product = Product::new("https://www.amazon.fr/dp/Y", "amazon", "EUR");
        assert!(repo.update(&product).await.is_err());
    }

    #[tokio::test]
    async fn monitoring_config_schedule_round_trips() {
        let pool = pool().await;
        let products = SqliteProductRepository::new(pool.clone());
        let configs = SqliteMonitoringConfigRepository::new(pool);
        let product = Product::new("https://www.amazon.fr/dp/Z", "amazon", "EUR");
        products.insert(&product).await.unwrap();

        let mut config = MonitoringConfig::new(product.id);
        configs.insert(&config).await.unwrap();
        config.mark_monitored(Utc::now());
        configs.update_schedule(&config).await.unwrap();

        let loaded = configs.get_by_product(product.id).await.unwrap().unwrap();
        assert_eq!(loaded.last_monitored, config.last_monitored);
    }
}
