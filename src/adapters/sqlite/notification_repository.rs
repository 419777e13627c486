//! SQLite implementations of the Notification Pipeline's persistence ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{
    BatchStatus, BatchType, Channel, DeliveryStatus, EngagementEvent, EngagementKind, EngagementMetrics,
    NotificationBatch, NotificationDelivery,
};
use crate::domain::ports::{EngagementRepository, NotificationBatchRepository, NotificationDeliveryRepository};

use super::{parse_datetime, parse_json, parse_optional_datetime, parse_optional_uuid, parse_uuid};

fn channel_to_str(c: Channel) -> &'static str {
    match c {
        Channel::Email => "email",
        Channel::Push => "push",
        Channel::InApp => "in_app",
    }
}

fn channel_from_str(s: &str) -> Result<Channel, DatabaseError> {
    match s {
        "email" => Ok(Channel::Email),
        "push" => Ok(Channel::Push),
        "in_app" => Ok(Channel::InApp),
        other => Err(DatabaseError::SerializationError(format!("unknown channel: {other}"))),
    }
}

fn batch_type_to_str(b: BatchType) -> &'static str {
    match b {
        BatchType::Immediate => "immediate",
        BatchType::Hourly => "hourly",
        BatchType::Daily => "daily",
    }
}

fn batch_type_from_str(s: &str) -> Result<BatchType, DatabaseError> {
    match s {
        "immediate" => Ok(BatchType::Immediate),
        "hourly" => Ok(BatchType::Hourly),
        "daily" => Ok(BatchType::Daily),
        other => Err(DatabaseError::SerializationError(format!("unknown batch type: {other}"))),
    }
}

fn batch_status_to_str(s: BatchStatus) -> &'static str {
    match s {
        BatchStatus::Pending => "pending",
        BatchStatus::Sent => "sent",
        BatchStatus::Failed => "failed",
    }
}

fn batch_status_from_str(s: &str) -> Result<BatchStatus, DatabaseError> {
    match s {
        "pending" => Ok(BatchStatus::Pending),
        "sent" => Ok(BatchStatus::Sent),
        "failed" => Ok(BatchStatus::Failed),
        other => Err(DatabaseError::SerializationError(format!("unknown batch status: {other}"))),
    }
}

fn delivery_status_to_str(s: DeliveryStatus) -> &'static str {
    match s {
        DeliveryStatus::Pending => "pending",
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Opened => "opened",
        DeliveryStatus::Clicked => "clicked",
        DeliveryStatus::Failed => "failed",
    }
}

fn delivery_status_from_str(s: &str) -> Result<DeliveryStatus, DatabaseError> {
    match s {
        "pending" => Ok(DeliveryStatus::Pending),
        "sent" => Ok(DeliveryStatus::Sent),
        "delivered" => Ok(DeliveryStatus::Delivered),
        "opened" => Ok(DeliveryStatus::Opened),
        "clicked" => Ok(DeliveryStatus::Clicked),
        "failed" => Ok(DeliveryStatus::Failed),
        other => Err(DatabaseError::SerializationError(format!("unknown delivery status: {other}"))),
    }
}

fn engagement_kind_to_str(k: EngagementKind) -> &'static str {
    match k {
        EngagementKind::Opened => "opened",
        EngagementKind::Clicked => "clicked",
        EngagementKind::ActionTaken => "action_taken",
    }
}

fn engagement_kind_from_str(s: &str) -> Result<EngagementKind, DatabaseError> {
    match s {
        "opened" => Ok(EngagementKind::Opened),
        "clicked" => Ok(EngagementKind::Clicked),
        "action_taken" => Ok(EngagementKind::ActionTaken),
        other => Err(DatabaseError::SerializationError(format!("unknown engagement kind: {other}"))),
    }
}

#[derive(FromRow)]
struct NotificationBatchRow {
    id: String,
    user_id: String,
    channel: String,
    batch_type: String,
    alert_ids: String,
    scheduled_for: String,
    status: String,
}

impl TryFrom<NotificationBatchRow> for NotificationBatch {
    type Error = DatabaseError;

    fn try_from(row: NotificationBatchRow) -> Result<Self, Self::Error> {
        let alert_ids: Vec<Uuid> = parse_json(&row.alert_ids)?;
        Ok(NotificationBatch {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            channel: channel_from_str(&row.channel)?,
            batch_type: batch_type_from_str(&row.batch_type)?,
            alert_ids,
            scheduled_for: parse_datetime(&row.scheduled_for)?,
            status: batch_status_from_str(&row.status)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteNotificationBatchRepository {
    pool: SqlitePool,
}

impl SqliteNotificationBatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationBatchRepository for SqliteNotificationBatchRepository {
    async fn insert(&self, batch: &NotificationBatch) -> Result<(), DatabaseError> {
        let alert_ids =
            serde_json::to_string(&batch.alert_ids).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO notification_batches (id, user_id, channel, batch_type, alert_ids, scheduled_for, status)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(batch.id.to_string())
        .bind(batch.user_id.to_string())
        .bind(channel_to_str(batch.channel))
        .bind(batch_type_to_str(batch.batch_type))
        .bind(alert_ids)
        .bind(batch.scheduled_for.to_rfc3339())
        .bind(batch_status_to_str(batch.status))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, batch: &NotificationBatch) -> Result<(), DatabaseError> {
        let alert_ids =
            serde_json::to_string(&batch.alert_ids).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE notification_batches SET alert_ids = ?, scheduled_for = ?, status = ? WHERE id = ?",
        )
        .bind(alert_ids)
        .bind(batch.scheduled_for.to_rfc3339())
        .bind(batch_status_to_str(batch.status))
        .bind(batch.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn open_batch(
        &self,
        user_id: Uuid,
        channel: Channel,
        batch_type: BatchType,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationBatch>, DatabaseError> {
        let row: Option<NotificationBatchRow> = sqlx::query_as(
            r#"SELECT * FROM notification_batches WHERE user_id = ? AND channel = ? AND batch_type = ?
               AND status = 'pending' AND scheduled_for > ? LIMIT 1"#,
        )
        .bind(user_id.to_string())
        .bind(channel_to_str(channel))
        .bind(batch_type_to_str(batch_type))
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(NotificationBatch::try_from).transpose()
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<NotificationBatch>, DatabaseError> {
        let rows: Vec<NotificationBatchRow> = sqlx::query_as(
            "SELECT * FROM notification_batches WHERE status = 'pending' AND scheduled_for <= ?",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(NotificationBatch::try_from).collect()
    }
}

#[derive(FromRow)]
struct NotificationDeliveryRow {
    id: String,
    user_id: String,
    channel: String,
    alert_id: Option<String>,
    batch_id: Option<String>,
    status: String,
    attempt_count: i64,
    external_message_id: Option<String>,
    last_error: Option<String>,
    created_at: String,
    sent_at: Option<String>,
}

impl TryFrom<NotificationDeliveryRow> for NotificationDelivery {
    type Error = DatabaseError;

    fn try_from(row: NotificationDeliveryRow) -> Result<Self, Self::Error> {
        Ok(NotificationDelivery {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            channel: channel_from_str(&row.channel)?,
            alert_id: parse_optional_uuid(row.alert_id)?,
            batch_id: parse_optional_uuid(row.batch_id)?,
            status: delivery_status_from_str(&row.status)?,
            attempt: row.attempt_count as u32,
            max_attempts: 5,
            external_message_id: row.external_message_id,
            error: row.last_error,
            created_at: parse_datetime(&row.created_at)?,
            sent_at: parse_optional_datetime(row.sent_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteNotificationDeliveryRepository {
    pool: SqlitePool,
}

impl SqliteNotificationDeliveryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationDeliveryRepository for SqliteNotificationDeliveryRepository {
    async fn insert(&self, delivery: &NotificationDelivery) -> Result<(), DatabaseError> {
        let next_retry_at = retry_schedule(delivery);
        sqlx::query(
            r#"INSERT INTO notification_deliveries (id, user_id, channel, alert_id, batch_id, status,
               attempt_count, external_message_id, last_error, created_at, sent_at, next_retry_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(delivery.id.to_string())
        .bind(delivery.user_id.to_string())
        .bind(channel_to_str(delivery.channel))
        .bind(delivery.alert_id.map(|id| id.to_string()))
        .bind(delivery.batch_id.map(|id| id.to_string()))
        .bind(delivery_status_to_str(delivery.status))
        .bind(i64::from(delivery.attempt))
        .bind(&delivery.external_message_id)
        .bind(&delivery.error)
        .bind(delivery.created_at.to_rfc3339())
        .bind(delivery.sent_at.map(|t| t.to_rfc3339()))
        .bind(next_retry_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationDelivery>, DatabaseError> {
        let row: Option<NotificationDeliveryRow> = sqlx::query_as("SELECT * FROM notification_deliveries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(NotificationDelivery::try_from).transpose()
    }

    async fn update(&self, delivery: &NotificationDelivery) -> Result<(), DatabaseError> {
        let next_retry_at = retry_schedule(delivery);
        let result = sqlx::query(
            r#"UPDATE notification_deliveries SET status = ?, attempt_count = ?, external_message_id = ?,
               last_error = ?, sent_at = ?, next_retry_at = ? WHERE id = ?"#,
        )
        .bind(delivery_status_to_str(delivery.status))
        .bind(i64::from(delivery.attempt))
        .bind(&delivery.external_message_id)
        .bind(&delivery.error)
        .bind(delivery.sent_at.map(|t| t.to_rfc3339()))
        .bind(next_retry_at.map(|t| t.to_rfc3339()))
        .bind(delivery.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn recently_delivered(&self, alert_id: Uuid, channel: Channel, since: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM notification_deliveries WHERE alert_id = ? AND channel = ?
               AND status != 'failed' AND created_at >= ?"#,
        )
        .bind(alert_id.to_string())
        .bind(channel_to_str(channel))
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count > 0)
    }

    async fn failed_retryable(&self, now: DateTime<Utc>) -> Result<Vec<NotificationDelivery>, DatabaseError> {
        let rows: Vec<NotificationDeliveryRow> = sqlx::query_as(
            r#"SELECT * FROM notification_deliveries WHERE status = 'failed' AND attempt_count < 5
               AND (next_retry_at IS NULL OR next_retry_at <= ?)"#,
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(NotificationDelivery::try_from).collect()
    }
}

/// Persistence-only scheduling metadata: when a failed delivery becomes
/// eligible for the retry sweep. Not part of the domain model itself.
fn retry_schedule(delivery: &NotificationDelivery) -> Option<DateTime<Utc>> {
    if delivery.status == DeliveryStatus::Failed {
        Some(Utc::now() + delivery.retry_backoff())
    } else {
        None
    }
}

#[derive(Clone)]
pub struct SqliteEngagementRepository {
    pool: SqlitePool,
}

impl SqliteEngagementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for SqliteEngagementRepository {
    async fn record_event(&self, event: &EngagementEvent) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO engagement_events (id, user_id, delivery_id, channel, kind, occurred_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(event.id.to_string())
        .bind(event.user_id.to_string())
        .bind(event.delivery_id.to_string())
        .bind(channel_to_str(event.channel))
        .bind(engagement_kind_to_str(event.kind))
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_metrics(&self, user_id: Uuid) -> Result<Option<EngagementMetrics>, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT metrics_json FROM engagement_metrics WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(|(json,)| parse_json(&json)).transpose()
    }

    async fn save_metrics(&self, metrics: &EngagementMetrics) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(metrics).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO engagement_metrics (user_id, metrics_json) VALUES (?, ?)
               ON CONFLICT(user_id) DO UPDATE SET metrics_json = excluded.metrics_json"#,
        )
        .bind(metrics.user_id.to_string())
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn batch_open_batch_excludes_past_schedule() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNotificationBatchRepository::new(pool);
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let batch = NotificationBatch::open(user_id, Channel::Email, BatchType::Hourly, now + chrono::Duration::minutes(30));
        repo.insert(&batch).await.unwrap();

        let found = repo.open_batch(user_id, Channel::Email, BatchType::Hourly, now).await.unwrap();
        assert_eq!(found.unwrap().id, batch.id);
    }

    #[tokio::test]
    async fn delivery_recently_delivered_excludes_failed() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNotificationDeliveryRepository::new(pool);
        let alert_id = Uuid::new_v4();
        let mut delivery = NotificationDelivery::new_for_alert(Uuid::new_v4(), Channel::Email, alert_id);
        delivery.mark_failed("boom");
        repo.insert(&delivery).await.unwrap();

        let seen = repo.recently_delivered(alert_id, Channel::Email, Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert!(!seen);
    }

    #[tokio::test]
    async fn engagement_metrics_round_trip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteEngagementRepository::new(pool);
        let mut metrics = EngagementMetrics::new(Uuid::new_v4());
        metrics.record_sent(Channel::Email, BatchType::Hourly);
        repo.save_metrics(&metrics).await.unwrap();

        let loaded = repo.get_metrics(metrics.user_id).await.unwrap().unwrap();
        assert_eq!(loaded.per_channel.get(&Channel::Email).unwrap().sent, 1);
    }
}
