//! Persistence ports for the Notification Pipeline (C7).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{Channel, EngagementEvent, EngagementMetrics, NotificationBatch, NotificationDelivery};

#[async_trait]
pub trait NotificationBatchRepository: Send + Sync {
    async fn insert(&self, batch: &NotificationBatch) -> Result<(), DatabaseError>;
    async fn update(&self, batch: &NotificationBatch) -> Result<(), DatabaseError>;

    /// The currently open (not yet sent/failed) batch for (user, channel,
    /// batch_type), if one exists and is still scheduled in the future
    /// (§4.6 `hourly`/`daily` append behavior).
    async fn open_batch(
        &self,
        user_id: Uuid,
        channel: Channel,
        batch_type: crate::domain::models::BatchType,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationBatch>, DatabaseError>;

    /// Pending batches due for dispatch (§4.6 periodic sweep).
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<NotificationBatch>, DatabaseError>;
}

#[async_trait]
pub trait NotificationDeliveryRepository: Send + Sync {
    async fn insert(&self, delivery: &NotificationDelivery) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<NotificationDelivery>, DatabaseError>;
    async fn update(&self, delivery: &NotificationDelivery) -> Result<(), DatabaseError>;

    /// Whether (alert, channel) was already delivered within the
    /// de-duplication window (§4.6).
    async fn recently_delivered(
        &self,
        alert_id: Uuid,
        channel: Channel,
        since: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Failed deliveries eligible for a retry sweep (§4.6).
    async fn failed_retryable(&self, now: DateTime<Utc>) -> Result<Vec<NotificationDelivery>, DatabaseError>;
}

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn record_event(&self, event: &EngagementEvent) -> Result<(), DatabaseError>;
    async fn get_metrics(&self, user_id: Uuid) -> Result<Option<EngagementMetrics>, DatabaseError>;
    async fn save_metrics(&self, metrics: &EngagementMetrics) -> Result<(), DatabaseError>;
}
