//! SQLite implementation of [`ObservationRepository`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{AlertTrigger, ObservationPayload, ObservationResult};
use crate::domain::ports::ObservationRepository;

use super::{parse_datetime, parse_decimal, parse_json, parse_optional_decimal, parse_uuid};

#[derive(FromRow)]
struct ObservationRow {
    id: String,
    product_id: String,
    task_id: String,
    observed_at: String,
    previous_price: Option<String>,
    current_price: String,
    price_changed: bool,
    price_change_amount: String,
    price_change_percentage: String,
    previously_available: Option<bool>,
    currently_available: bool,
    availability_changed: bool,
    is_deal: bool,
    raw_payload: String,
    triggers: String,
}

impl TryFrom<ObservationRow> for ObservationResult {
    type Error = DatabaseError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let raw_payload: ObservationPayload = parse_json(&row.raw_payload)?;
        let triggers: Vec<AlertTrigger> = parse_json(&row.triggers)?;
        Ok(ObservationResult {
            id: parse_uuid(&row.id)?,
            product_id: parse_uuid(&row.product_id)?,
            task_id: parse_uuid(&row.task_id)?,
            observed_at: parse_datetime(&row.observed_at)?,
            previous_price: parse_optional_decimal(row.previous_price)?,
            current_price: parse_decimal(&row.current_price)?,
            price_changed: row.price_changed,
            price_change_amount: parse_decimal(&row.price_change_amount)?,
            price_change_percentage: parse_decimal(&row.price_change_percentage)?,
            previously_available: row.previously_available,
            currently_available: row.currently_available,
            availability_changed: row.availability_changed,
            is_deal: row.is_deal,
            raw_payload,
            triggers,
        })
    }
}

#[derive(Clone)]
pub struct SqliteObservationRepository {
    pool: SqlitePool,
}

impl SqliteObservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ObservationRepository for SqliteObservationRepository {
    async fn insert(&self, result: &ObservationResult) -> Result<(), DatabaseError> {
        let raw_payload = serde_json::to_string(&result.raw_payload)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let triggers = serde_json::to_string(&result.triggers)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO observation_results (id, product_id, task_id, observed_at, previous_price,
               current_price, price_changed, price_change_amount, price_change_percentage,
               previously_available, currently_available, availability_changed, is_deal, raw_payload, triggers)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(result.id.to_string())
        .bind(result.product_id.to_string())
        .bind(result.task_id.to_string())
        .bind(result.observed_at.to_rfc3339())
        .bind(result.previous_price.map(|d| d.to_string()))
        .bind(result.current_price.to_string())
        .bind(result.price_changed)
        .bind(result.price_change_amount.to_string())
        .bind(result.price_change_percentage.to_string())
        .bind(result.previously_available)
        .bind(result.currently_available)
        .bind(result.availability_changed)
        .bind(result.is_deal)
        .bind(raw_payload)
        .bind(triggers)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn latest_for_product(&self, product_id: Uuid) -> Result<Option<ObservationResult>, DatabaseError> {
        let row: Option<ObservationRow> = sqlx::query_as(
            "SELECT * FROM observation_results WHERE product_id = ? ORDER BY observed_at DESC LIMIT 1",
        )
        .bind(product_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(ObservationResult::try_from).transpose()
    }

    async fn recent_for_product(&self, product_id: Uuid, days: u32) -> Result<Vec<ObservationResult>, DatabaseError> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let rows: Vec<ObservationRow> = sqlx::query_as(
            "SELECT * FROM observation_results WHERE product_id = ? AND observed_at >= ? ORDER BY observed_at DESC",
        )
        .bind(product_id.to_string())
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(ObservationResult::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::product_repository::SqliteProductRepository;
    use crate::domain::models::Product;
    use crate::domain::ports::ProductRepository;
    use std::collections::HashMap;

    fn payload() -> ObservationPayload {
        ObservationPayload {
            title: "widget".into(),
            price: "19.99".parse().unwrap(),
            currency: "EUR".into(),
            in_stock: true,
            image_url: None,
            sku: None,
            description: None,
            is_deal: false,
            screenshots: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn insert_then_latest_round_trips() {
        let pool = create_migrated_test_pool().await.unwrap();
        let products = SqliteProductRepository::new(pool.clone());
        let product = Product::new("https://www.amazon.fr/dp/O", "amazon", "EUR");
        products.insert(&product).await.unwrap();

        let repo = SqliteObservationRepository::new(pool);
        let result = ObservationResult::diff(product.id, Uuid::new_v4(), Utc::now(), payload(), None);
        repo.insert(&result).await.unwrap();

        let loaded = repo.latest_for_product(product.id).await.unwrap().unwrap();
        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn recent_for_product_filters_by_window() {
        let pool = create_migrated_test_pool().await.unwrap();
        let products = SqliteProductRepository::new(pool.clone());
        let product = Product::new("https://www.amazon.fr/dp/P", "amazon", "EUR");
        products.insert(&product).await.unwrap();

        let repo = SqliteObservationRepository::new(pool);
        let result = ObservationResult::diff(product.id, Uuid::new_v4(), Utc::now(), payload(), None);
        repo.insert(&result).await.unwrap();

        let recent = repo.recent_for_product(product.id, 30).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}
