//! SQLite database adapters for the price-monitoring core.

pub mod alert_repository;
pub mod connection;
pub mod migrations;
pub mod notification_repository;
pub mod observation_repository;
pub mod product_repository;
pub mod task_repository;

pub use alert_repository::{SqliteAlertRepository, SqliteAlertRuleRepository};
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use notification_repository::{
    SqliteEngagementRepository, SqliteNotificationBatchRepository, SqliteNotificationDeliveryRepository,
};
pub use observation_repository::SqliteObservationRepository;
pub use product_repository::{SqliteMonitoringConfigRepository, SqliteProductRepository};
pub use task_repository::SqliteTaskRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::error::DatabaseError;

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

/// Parse an optional UUID string from a SQLite row field.
pub fn parse_optional_uuid(s: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    s.map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

/// Parse a decimal string from a SQLite row field.
pub fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal, DatabaseError> {
    s.parse().map_err(|_| DatabaseError::SerializationError(format!("invalid decimal: {s}")))
}

/// Parse an optional decimal string from a SQLite row field.
pub fn parse_optional_decimal(s: Option<String>) -> Result<Option<rust_decimal::Decimal>, DatabaseError> {
    s.map(|s| parse_decimal(&s)).transpose()
}

/// Parse a JSON string from a SQLite row field.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(s).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, AdapterError> {
    let pool = create_pool(database_url, None).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

pub async fn initialize_default_database() -> Result<SqlitePool, AdapterError> {
    initialize_database("sqlite:.price-monitor/price-monitor.db").await
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, AdapterError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
