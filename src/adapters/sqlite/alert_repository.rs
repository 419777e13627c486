//! SQLite implementation of [`AlertRuleRepository`] and [`AlertRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{
    Alert, AlertRule, BatchType, ChannelMap, Condition, EventType, PriceDeltaSnapshot,
};
use crate::domain::ports::{AlertRepository, AlertRuleRepository};

use super::{parse_datetime, parse_decimal, parse_json, parse_optional_decimal, parse_optional_uuid, parse_uuid};

fn event_type_to_str(t: EventType) -> &'static str {
    match t {
        EventType::PriceDropped => "price_dropped",
        EventType::PriceIncreased => "price_increased",
        EventType::AvailabilityChanged => "availability_changed",
        EventType::PricePredictionMade => "price_prediction_made",
    }
}

fn event_type_from_str(s: &str) -> Result<EventType, DatabaseError> {
    match s {
        "price_dropped" => Ok(EventType::PriceDropped),
        "price_increased" => Ok(EventType::PriceIncreased),
        "availability_changed" => Ok(EventType::AvailabilityChanged),
        "price_prediction_made" => Ok(EventType::PricePredictionMade),
        other => Err(DatabaseError::SerializationError(format!("unknown event type: {other}"))),
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

#[derive(FromRow)]
struct AlertRuleRow {
    id: String,
    user_id: String,
    product_id: Option<String>,
    rule_type: String,
    condition: String,
    channels: String,
    base_priority: i64,
    batch_type: String,
    active: bool,
}

impl TryFrom<AlertRuleRow> for AlertRule {
    type Error = DatabaseError;

    fn try_from(row: AlertRuleRow) -> Result<Self, Self::Error> {
        let condition: Condition = parse_json(&row.condition)?;
        let channels: ChannelMap = parse_json(&row.channels)?;
        Ok(AlertRule {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            product_id: parse_optional_uuid(row.product_id)?,
            rule_type: event_type_from_str(&row.rule_type)?,
            condition,
            channels,
            base_priority: row.base_priority as u8,
            batch_type: batch_type_from_str(&row.batch_type)?,
            active: row.active,
        })
    }
}

#[derive(Clone)]
pub struct SqliteAlertRuleRepository {
    pool: SqlitePool,
}

impl SqliteAlertRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRuleRepository for SqliteAlertRuleRepository {
    async fn insert(&self, rule: &AlertRule) -> Result<(), DatabaseError> {
        let condition =
            serde_json::to_string(&rule.condition).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let channels =
            serde_json::to_string(&rule.channels).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO alert_rules (id, user_id, product_id, rule_type, condition, channels,
               base_priority, batch_type, active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(rule.id.to_string())
        .bind(rule.user_id.to_string())
        .bind(rule.product_id.map(|id| id.to_string()))
        .bind(event_type_to_str(rule.rule_type))
        .bind(condition)
        .bind(channels)
        .bind(i64::from(rule.base_priority))
        .bind(batch_type_to_str(rule.batch_type))
        .bind(rule.active)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AlertRule>, DatabaseError> {
        let row: Option<AlertRuleRow> = sqlx::query_as("SELECT * FROM alert_rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(AlertRule::try_from).transpose()
    }

    async fn update(&self, rule: &AlertRule) -> Result<(), DatabaseError> {
        let condition =
            serde_json::to_string(&rule.condition).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let channels =
            serde_json::to_string(&rule.channels).map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let result = sqlx::query(
            r#"UPDATE alert_rules SET product_id = ?, condition = ?, channels = ?, base_priority = ?,
               batch_type = ?, active = ? WHERE id = ?"#,
        )
        .bind(rule.product_id.map(|id| id.to_string()))
        .bind(condition)
        .bind(channels)
        .bind(i64::from(rule.base_priority))
        .bind(batch_type_to_str(rule.batch_type))
        .bind(rule.active)
        .bind(rule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn active_by_type(&self, rule_type: EventType) -> Result<Vec<AlertRule>, DatabaseError> {
        let rows: Vec<AlertRuleRow> = sqlx::query_as("SELECT * FROM alert_rules WHERE rule_type = ? AND active = 1")
            .bind(event_type_to_str(rule_type))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(AlertRule::try_from).collect()
    }

    async fn count_active_for_product(&self, product_id: Uuid) -> Result<u32, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM alert_rules WHERE active = 1 AND (product_id = ? OR product_id IS NULL)",
        )
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count as u32)
    }
}

#[derive(FromRow)]
struct AlertRow {
    id: String,
    user_id: String,
    product_id: String,
    rule_id: String,
    alert_type: String,
    message: String,
    previous_price: Option<String>,
    current_price: String,
    change_amount: String,
    change_percentage: String,
    priority: i64,
    created_at: String,
}

impl TryFrom<AlertRow> for Alert {
    type Error = DatabaseError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            product_id: parse_uuid(&row.product_id)?,
            rule_id: parse_uuid(&row.rule_id)?,
            alert_type: event_type_from_str(&row.alert_type)?,
            message: row.message,
            delta: PriceDeltaSnapshot {
                previous_price: parse_optional_decimal(row.previous_price)?,
                current_price: parse_decimal(&row.current_price)?,
                change_amount: parse_decimal(&row.change_amount)?,
                change_percentage: parse_decimal(&row.change_percentage)?,
            },
            priority: row.priority as u8,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteAlertRepository {
    pool: SqlitePool,
}

impl SqliteAlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for SqliteAlertRepository {
    async fn insert(&self, alert: &Alert) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO alerts (id, user_id, product_id, rule_id, alert_type, message, previous_price,
               current_price, change_amount, change_percentage, priority, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(alert.id.to_string())
        .bind(alert.user_id.to_string())
        .bind(alert.product_id.to_string())
        .bind(alert.rule_id.to_string())
        .bind(event_type_to_str(alert.alert_type))
        .bind(&alert.message)
        .bind(alert.delta.previous_price.map(|d| d.to_string()))
        .bind(alert.delta.current_price.to_string())
        .bind(alert.delta.change_amount.to_string())
        .bind(alert.delta.change_percentage.to_string())
        .bind(i64::from(alert.priority))
        .bind(alert.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DatabaseError> {
        let row: Option<AlertRow> = sqlx::query_as("SELECT * FROM alerts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(Alert::try_from).transpose()
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE created_at >= ?")
            .bind(since.to_rfc3339())
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
    use std::collections::HashMap;

    fn rule(user_id: Uuid) -> AlertRule {
        AlertRule {
            id: Uuid::new_v4(),
            user_id,
            product_id: None,
            rule_type: EventType::PriceDropped,
            condition: Condition::Compare {
                field: "isDeal".into(),
                op: crate::domain::models::Operator::Eq,
                value: crate::domain::models::FieldValue::Bool(true),
            },
            channels: ChannelMap::from([(crate::domain::models::Channel::Email, true)]),
            base_priority: 5,
            batch_type: BatchType::Hourly,
            active: true,
        }
    }

    #[tokio::test]
    async fn rule_round_trips_and_filters_by_type() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteAlertRuleRepository::new(pool);
        let r = rule(Uuid::new_v4());
        repo.insert(&r).await.unwrap();

        let matched = repo.active_by_type(EventType::PriceDropped).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, r.id);

        let unmatched = repo.active_by_type(EventType::PriceIncreased).await.unwrap();
        assert!(unmatched.is_empty());
    }

    #[tokio::test]
    async fn alert_count_since_respects_window() {
        let pool = create_migrated_test_pool().await.unwrap();
        let rules = SqliteAlertRuleRepository::new(pool.clone());
        let repo = SqliteAlertRepository::new(pool);
        let r = rule(Uuid::new_v4());
        rules.insert(&r).await.unwrap();

        let alert = Alert {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            product_id: Uuid::new_v4(),
            rule_id: r.id,
            alert_type: EventType::PriceDropped,
            message: "dropped".into(),
            delta: PriceDeltaSnapshot {
                previous_price: Some("10.00".parse().unwrap()),
                current_price: "8.00".parse().unwrap(),
                change_amount: "-2.00".parse().unwrap(),
                change_percentage: "-20.00".parse().unwrap(),
            },
            priority: 7,
            created_at: Utc::now(),
        };
        repo.insert(&alert).await.unwrap();

        let count = repo.count_since(Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(count, 1);
        let _ = HashMap::<String, String>::new();
    }
}
