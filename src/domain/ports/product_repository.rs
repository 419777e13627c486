//! Persistence ports for Product and MonitoringConfig (C1 policy store half).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{MonitoringConfig, Product};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>, DatabaseError>;
    async fn update(&self, product: &Product) -> Result<(), DatabaseError>;
    async fn count(&self) -> Result<u64, DatabaseError>;
}

#[async_trait]
pub trait MonitoringConfigRepository: Send + Sync {
    async fn insert(&self, config: &MonitoringConfig) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<MonitoringConfig>, DatabaseError>;
    async fn get_by_product(&self, product_id: Uuid) -> Result<Option<MonitoringConfig>, DatabaseError>;

    /// Active configs due at or before `now`, ordered by priority then
    /// `next_scheduled`, limited to `batch_size` (§4.2 `scheduleDueProducts`).
    async fn due(&self, now: DateTime<Utc>, batch_size: u32) -> Result<Vec<MonitoringConfig>, DatabaseError>;

    /// All active configs, for the priority-refresh pass (§4.2
    /// `updatePriorities`).
    async fn active(&self, batch_size: u32) -> Result<Vec<MonitoringConfig>, DatabaseError>;

    /// Atomic read-then-update of `next_scheduled`/`priority_score`,
    /// preventing the race described in §5 where two Scheduler runs select
    /// the same product.
    async fn update_schedule(&self, config: &MonitoringConfig) -> Result<(), DatabaseError>;

    async fn count_active(&self) -> Result<u64, DatabaseError>;
}
