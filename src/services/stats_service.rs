//! Aggregates [`MonitoringStats`] for the control-plane `stats` surface (§6).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use tracing::instrument;

use crate::domain::error::DatabaseError;
use crate::domain::models::{MonitoringStats, TaskStatus};
use crate::domain::ports::{AlertRepository, MonitoringConfigRepository, ProductRepository, TaskRepository};

/// How far back to count fired alerts when aggregating stats.
const ALERT_WINDOW: Duration = Duration::hours(24);

pub struct StatsService {
    products: Arc<dyn ProductRepository>,
    configs: Arc<dyn MonitoringConfigRepository>,
    tasks: Arc<dyn TaskRepository>,
    alerts: Arc<dyn AlertRepository>,
}

impl StatsService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        configs: Arc<dyn MonitoringConfigRepository>,
        tasks: Arc<dyn TaskRepository>,
        alerts: Arc<dyn AlertRepository>,
    ) -> Self {
        Self { products, configs, tasks, alerts }
    }

    #[instrument(skip(self), err)]
    pub async fn compute(&self, now: DateTime<Utc>) -> Result<MonitoringStats, DatabaseError> {
        let products_tracked = self.products.count().await?;
        let active_configs = self.configs.count_active().await?;

        let mut tasks_by_status = std::collections::HashMap::new();
        for status in [
            TaskStatus::Pending,
            TaskStatus::Scheduled,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            let count = self.tasks.count_by_status(status).await?;
            tasks_by_status.insert(status, count);
        }

        let active = self.configs.active(u32::try_from(active_configs).unwrap_or(u32::MAX).max(1)).await?;
        let average_priority_score = if active.is_empty() {
            0.0
        } else {
            let sum: f64 = active.iter().map(|c| c.priority_score.to_f64().unwrap_or(0.0)).sum();
            sum / active.len() as f64
        };

        let alerts_fired_last_window = self.alerts.count_since(now - ALERT_WINDOW).await?;

        Ok(MonitoringStats {
            computed_at: now,
            products_tracked,
            active_configs,
            tasks_by_status,
            average_priority_score,
            alerts_fired_last_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use uuid::Uuid;

    mock! {
        Products {}
        #[async_trait::async_trait]
        impl ProductRepository for Products {
            async fn insert(&self, product: &crate::domain::models::Product) -> Result<(), DatabaseError>;
            async fn get(&self, id: Uuid) -> Result<Option<crate::domain::models::Product>, DatabaseError>;
            async fn update(&self, product: &crate::domain::models::Product) -> Result<(), DatabaseError>;
            async fn count(&self) -> Result<u64, DatabaseError>;
        }
    }

    mock! {
        Configs {}
        #[async_trait::async_trait]
        impl MonitoringConfigRepository for Configs {
            async fn insert(&self, config: &crate::domain::models::MonitoringConfig) -> Result<(), DatabaseError>;
            async fn get(&self, id: Uuid) -> Result<Option<crate::domain::models::MonitoringConfig>, DatabaseError>;
            async fn get_by_product(&self, product_id: Uuid) -> Result<Option<crate::domain::models::MonitoringConfig>, DatabaseError>;
            async fn due(&self, now: DateTime<Utc>, batch_size: u32) -> Result<Vec<crate::domain::models::MonitoringConfig>, DatabaseError>;
            async fn active(&self, batch_size: u32) -> Result<Vec<crate::domain::models::MonitoringConfig>, DatabaseError>;
            async fn update_schedule(&self, config: &crate::domain::models::MonitoringConfig) -> Result<(), DatabaseError>;
            async fn count_active(&self) -> Result<u64, DatabaseError>;
        }
    }

    mock! {
        Tasks {}
        #[async_trait::async_trait]
        impl TaskRepository for Tasks {
            async fn insert(&self, task: &crate::domain::models::Task) -> Result<(), DatabaseError>;
            async fn get(&self, id: Uuid) -> Result<Option<crate::domain::models::Task>, DatabaseError>;
            async fn update(&self, task: &crate::domain::models::Task) -> Result<(), DatabaseError>;
            async fn pending_ordered(&self, limit: u32) -> Result<Vec<crate::domain::models::Task>, DatabaseError>;
            async fn pending_for_retailer(&self, retailer: &str, limit: u32) -> Result<Vec<crate::domain::models::Task>, DatabaseError>;
            async fn running_counts_by_retailer(&self) -> Result<Vec<(String, u64)>, DatabaseError>;
            async fn count_by_status(&self, status: TaskStatus) -> Result<u64, DatabaseError>;
            async fn count_by_lane_and_status(&self, lane: crate::domain::models::Lane, status: TaskStatus) -> Result<u64, DatabaseError>;
            async fn prunable_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError>;
            async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DatabaseError>;
        }
    }

    mock! {
        Alerts {}
        #[async_trait::async_trait]
        impl AlertRepository for Alerts {
            async fn insert(&self, alert: &crate::domain::models::Alert) -> Result<(), DatabaseError>;
            async fn get(&self, id: Uuid) -> Result<Option<crate::domain::models::Alert>, DatabaseError>;
            async fn count_since(&self, since: DateTime<Utc>) -> Result<u64, DatabaseError>;
        }
    }

    #[tokio::test]
    async fn compute_aggregates_all_sources() {
        let mut products = MockProducts::new();
        products.expect_count().returning(|| Ok(42));

        let mut configs = MockConfigs::new();
        configs.expect_count_active().returning(|| Ok(10));
        configs.expect_active().returning(|_| Ok(vec![]));

        let mut tasks = MockTasks::new();
        tasks.expect_count_by_status().returning(|_| Ok(3));

        let mut alerts = MockAlerts::new();
        alerts.expect_count_since().returning(|_| Ok(5));

        let svc = StatsService::new(Arc::new(products), Arc::new(configs), Arc::new(tasks), Arc::new(alerts));
        let stats = svc.compute(Utc::now()).await.unwrap();

        assert_eq!(stats.products_tracked, 42);
        assert_eq!(stats.active_configs, 10);
        assert_eq!(stats.alerts_fired_last_window, 5);
        assert_eq!(stats.tasks_by_status.get(&TaskStatus::Pending), Some(&3));
    }
}
