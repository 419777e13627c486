//! Scheduler (C3, §4.2): selects due products, creates Tasks, advances
//! `next_scheduled`, and periodically refreshes priority scores.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{MonitoringConfig, Task};
use crate::domain::ports::priority_scorer::ScoringContext;
use crate::domain::ports::{
    AlertRuleRepository, Clock, MonitoringConfigRepository, ObservationRepository, PriorityScorer, ProductRepository,
    TaskRepository,
};

pub struct Scheduler {
    configs: Arc<dyn MonitoringConfigRepository>,
    products: Arc<dyn ProductRepository>,
    tasks: Arc<dyn TaskRepository>,
    observations: Arc<dyn ObservationRepository>,
    alert_rules: Arc<dyn AlertRuleRepository>,
    scorer: Arc<dyn PriorityScorer>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        configs: Arc<dyn MonitoringConfigRepository>,
        products: Arc<dyn ProductRepository>,
        tasks: Arc<dyn TaskRepository>,
        observations: Arc<dyn ObservationRepository>,
        alert_rules: Arc<dyn AlertRuleRepository>,
        scorer: Arc<dyn PriorityScorer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { configs, products, tasks, observations, alert_rules, scorer, clock }
    }

    /// §4.2 operation 1: select up to `batch_size` due configs, create a
    /// Task for each, and advance `next_scheduled`. Returns the count
    /// scheduled.
    #[instrument(skip(self), err)]
    pub async fn schedule_due_products(&self, batch_size: u32) -> Result<u32> {
        let now = self.clock.now();
        let due = self.configs.due(now, batch_size).await.context("loading due configs")?;
        let mut scheduled = 0u32;

        for mut config in due {
            let priority = round_priority(config.priority_score);
            let task = Task::new(config.product_id, priority, now).context("building task")?;
            self.tasks.insert(&task).await.context("inserting task")?;

            config.next_scheduled = Some(now + config.frequency.interval());
            self.configs.update_schedule(&config).await.context("advancing schedule")?;
            scheduled += 1;
        }

        Ok(scheduled)
    }

    /// §4.2 operation 2: create a Task unconditionally, creating a default
    /// config first if the product has none.
    #[instrument(skip(self), err)]
    pub async fn schedule_immediate(&self, product_id: Uuid, priority: Option<u8>) -> Result<Task> {
        let now = self.clock.now();
        let config = match self.configs.get_by_product(product_id).await? {
            Some(c) => c,
            None => {
                let c = MonitoringConfig::new(product_id);
                self.configs.insert(&c).await.context("inserting default config")?;
                c
            }
        };
        let priority = priority.unwrap_or_else(|| round_priority(config.priority_score));
        let task = Task::new(product_id, priority, now)?;
        self.tasks.insert(&task).await.context("inserting immediate task")?;
        Ok(task)
    }

    /// §4.2 operation 3: recompute and persist `priority_score` for active
    /// configs.
    #[instrument(skip(self), err)]
    pub async fn update_priorities(&self, batch_size: u32) -> Result<u32> {
        let now = self.clock.now();
        let configs = self.configs.active(batch_size).await.context("loading active configs")?;
        let mut updated = 0u32;

        for mut config in configs {
            let Some(product) = self.products.get(config.product_id).await.context("loading product")? else {
                continue;
            };
            let context = self.build_scoring_context(&product).await?;
            let score = self.scorer.score(&product, &config, &context, now)?;
            config.priority_score = score;
            self.configs.update_schedule(&config).await.context("persisting score")?;
            updated += 1;
        }

        Ok(updated)
    }

    async fn build_scoring_context(&self, product: &crate::domain::models::Product) -> Result<ScoringContext> {
        let recent = self.observations.recent_for_product(product.id, 30).await.context("loading recent observations")?;
        let price_min_30d = recent.iter().map(|o| o.current_price).min();
        let price_max_30d = recent.iter().map(|o| o.current_price).max();
        let price_change_count_30d = recent.iter().filter(|o| o.price_changed).count() as u32;
        let active_alert_rule_count =
            self.alert_rules.count_active_for_product(product.id).await.context("counting active rules")?;
        Ok(ScoringContext {
            observation_count_30d: recent.len() as u32,
            price_change_count_30d,
            price_min_30d,
            price_max_30d,
            active_alert_rule_count,
            view_count: 0,
        })
    }

    /// Optional load-balanced distribution: buckets due configs across the
    /// 24 hours of a day, probing outward from the preferred hour when full
    /// (§4.2).
    #[instrument(skip(self), err)]
    pub async fn distribute_load(&self, max_per_hour: u32, date: DateTime<Utc>) -> Result<HashMap<u32, u32>> {
        let configs = self.configs.active(u32::MAX).await.context("loading configs to distribute")?;
        let mut buckets: HashMap<u32, u32> = HashMap::new();

        for config in configs {
            let Some(next) = config.next_scheduled else { continue };
            if next.date_naive() != date.date_naive() {
                continue;
            }
            let preferred = u32::try_from(next.hour_value()).unwrap_or(0);
            if let Some(hour) = find_bucket_with_room(&buckets, preferred, max_per_hour) {
                *buckets.entry(hour).or_insert(0) += 1;
            } else {
                tracing::warn!(product_id = %config.product_id, "no free hour bucket to distribute load into");
            }
        }

        Ok(buckets)
    }
}

fn find_bucket_with_room(buckets: &HashMap<u32, u32>, preferred: u32, max_per_hour: u32) -> Option<u32> {
    for offset in 0..=11i32 {
        for candidate in [preferred as i32 + offset, preferred as i32 - offset] {
            let hour = candidate.rem_euclid(24) as u32;
            if *buckets.get(&hour).unwrap_or(&0) < max_per_hour {
                return Some(hour);
            }
        }
    }
    None
}

/// Round a `[1, 10]` priority score to the nearest integer task priority.
fn round_priority(score: rust_decimal::Decimal) -> u8 {
    use rust_decimal::prelude::ToPrimitive;
    let rounded = score.round().to_u8().unwrap_or(10);
    rounded.clamp(1, 10)
}

trait HourOfDay {
    fn hour_value(&self) -> u32;
}

impl HourOfDay for DateTime<Utc> {
    fn hour_value(&self) -> u32 {
        use chrono::Timelike;
        self.hour()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_priority_clamps_and_rounds() {
        use rust_decimal::Decimal;
        assert_eq!(round_priority(Decimal::new(49, 1)), 5);
        assert_eq!(round_priority(Decimal::new(105, 1)), 10);
        assert_eq!(round_priority(Decimal::ZERO), 1);
    }

    #[test]
    fn find_bucket_with_room_prefers_nearest_hour() {
        let mut buckets = HashMap::new();
        buckets.insert(10u32, 5u32);
        assert_eq!(find_bucket_with_room(&buckets, 10, 5), Some(11));
    }

    #[test]
    fn find_bucket_with_room_wraps_around_day() {
        let mut buckets = HashMap::new();
        for h in 0..24 {
            buckets.insert(h, 5);
        }
        assert_eq!(find_bucket_with_room(&buckets, 10, 5), None);
    }
}
