//! Persistence ports for AlertRule and Alert (C6).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{Alert, AlertRule, EventType};

#[async_trait]
pub trait AlertRuleRepository: Send + Sync {
    async fn insert(&self, rule: &AlertRule) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<AlertRule>, DatabaseError>;
    async fn update(&self, rule: &AlertRule) -> Result<(), DatabaseError>;

    /// Active rules matching an event type, for evaluation (§4.5 step 1).
    async fn active_by_type(&self, rule_type: EventType) -> Result<Vec<AlertRule>, DatabaseError>;

    /// Count of active rules for a product, used by the Priority Scorer's
    /// popularity factor (§4.1).
    async fn count_active_for_product(&self, product_id: Uuid) -> Result<u32, DatabaseError>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: &Alert) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<Alert>, DatabaseError>;

    /// Alerts created within a trailing window, for stats aggregation (§3
    /// MonitoringStats).
    async fn count_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<u64, DatabaseError>;
}
