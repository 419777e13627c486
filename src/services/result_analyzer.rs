//! Result Analyzer (C5, §4.4): diffs a fresh observation against product
//! state, evaluates alert triggers in a fixed priority order, persists the
//! result, advances the monitoring schedule, and emits events.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{AlertTrigger, Event, EventType, FieldValue, ObservationPayload, ObservationResult};
use crate::domain::ports::{MonitoringConfigRepository, ObservationRepository, ProductRepository};
use crate::services::event_bus::EventBus;

pub struct ResultAnalyzer {
    products: Arc<dyn ProductRepository>,
    configs: Arc<dyn MonitoringConfigRepository>,
    observations: Arc<dyn ObservationRepository>,
    events: Arc<EventBus>,
}

impl ResultAnalyzer {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        configs: Arc<dyn MonitoringConfigRepository>,
        observations: Arc<dyn ObservationRepository>,
        events: Arc<EventBus>,
    ) -> Self {
        Self { products, configs, observations, events }
    }

    /// §4.4 steps 1-5: diff, trigger evaluation, persistence, schedule
    /// advance, and event emission. Returns the persisted observation.
    #[instrument(skip(self, payload), err)]
    pub async fn analyze(&self, product_id: Uuid, task_id: Uuid, payload: ObservationPayload, now: DateTime<Utc>) -> Result<ObservationResult> {
        let mut product = self
            .products
            .get(product_id)
            .await
            .context("loading product")?
            .ok_or_else(|| anyhow::anyhow!("product {product_id} not found"))?;

        let prior = self.observations.latest_for_product(product_id).await.context("loading prior observation")?;
        let config = self.configs.get_by_product(product_id).await.context("loading monitoring config")?;

        let mut result = ObservationResult::diff(product_id, task_id, now, payload, prior.as_ref());
        result.triggers = evaluate_triggers(&result, &product, config.as_ref().map(|c| (c.notify_on_any_change, c.price_threshold_absolute, c.price_threshold_pct)));

        self.observations.insert(&result).await.context("persisting observation")?;

        product.apply_observation(result.current_price, result.currently_available, now);
        self.products.update(&product).await.context("persisting product")?;

        if let Some(mut config) = config {
            config.mark_monitored(now);
            self.configs.update_schedule(&config).await.context("advancing monitoring schedule")?;
        }

        for trigger in &result.triggers {
            self.events.publish(build_event(trigger, &result));
        }

        Ok(result)
    }
}

/// §4.4 step 3: availability, then price, then lowest-ever (overrides price
/// drop), then deal (only if nothing else triggered).
fn evaluate_triggers(
    result: &ObservationResult,
    product: &crate::domain::models::Product,
    thresholds: Option<(bool, Option<Decimal>, Option<Decimal>)>,
) -> Vec<AlertTrigger> {
    let mut triggers = Vec::new();

    if result.availability_changed {
        match (result.previously_available, result.currently_available) {
            (Some(true), false) => triggers.push(AlertTrigger::OutOfStock),
            (Some(false), true) => triggers.push(AlertTrigger::BackInStock),
            _ => {}
        }
    }

    let mut price_drop_triggered = false;
    if result.price_changed && result.price_change_amount < Decimal::ZERO {
        let (notify_on_any_change, threshold_absolute, threshold_pct) = thresholds.unwrap_or((false, None, None));
        let abs_met = threshold_absolute.is_some_and(|t| result.price_change_amount.abs() >= t);
        let pct_met = threshold_pct.is_some_and(|t| result.price_change_percentage.abs() >= t);
        if abs_met || pct_met || notify_on_any_change {
            triggers.push(AlertTrigger::PriceDrop);
            price_drop_triggered = true;
        }
    }

    if result.current_price <= product.lowest_ever {
        if price_drop_triggered {
            triggers.retain(|t| *t != AlertTrigger::PriceDrop);
        }
        triggers.push(AlertTrigger::LowestPriceEver);
    }

    if result.is_deal && triggers.is_empty() {
        triggers.push(AlertTrigger::Deal);
    }

    triggers
}

fn build_event(trigger: &AlertTrigger, result: &ObservationResult) -> Event {
    let event_type = match trigger {
        AlertTrigger::OutOfStock | AlertTrigger::BackInStock => EventType::AvailabilityChanged,
        AlertTrigger::PriceDrop | AlertTrigger::LowestPriceEver | AlertTrigger::Deal => {
            if result.price_change_amount > Decimal::ZERO {
                EventType::PriceIncreased
            } else {
                EventType::PriceDropped
            }
        }
    };

    Event::new(event_type, result.product_id, result.id)
        .with_field("currentPrice", FieldValue::Decimal(result.current_price))
        .with_field("priceChangeAmount", FieldValue::Decimal(result.price_change_amount))
        .with_field("priceChangePercentage", FieldValue::Decimal(result.price_change_percentage))
        .with_field("isAvailable", FieldValue::Bool(result.currently_available))
        .with_field("isDeal", FieldValue::Bool(result.is_deal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Product;
    use std::collections::HashMap;

    fn payload(price: &str, in_stock: bool, is_deal: bool) -> ObservationPayload {
        ObservationPayload {
            title: "widget".into(),
            price: price.parse().unwrap(),
            currency: "EUR".into(),
            in_stock,
            image_url: None,
            sku: None,
            description: None,
            is_deal,
            screenshots: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    fn product_with_bounds(low: &str, high: &str) -> Product {
        let mut p = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
        p.lowest_ever = low.parse().unwrap();
        p.highest_ever = high.parse().unwrap();
        p
    }

    #[test]
    fn lowest_ever_overrides_price_drop() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        let next = ObservationResult::diff(prior.product_id, Uuid::new_v4(), Utc::now(), payload("50.00", true, false), Some(&prior));
        let product = product_with_bounds("60.00", "120.00");
        let triggers = evaluate_triggers(&next, &product, Some((true, None, None)));
        assert_eq!(triggers, vec![AlertTrigger::LowestPriceEver]);
    }

    #[test]
    fn out_of_stock_and_price_drop_can_both_fire() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        let next = ObservationResult::diff(prior.product_id, Uuid::new_v4(), Utc::now(), payload("90.00", false, false), Some(&prior));
        let product = product_with_bounds("50.00", "150.00");
        let triggers = evaluate_triggers(&next, &product, Some((true, None, None)));
        assert!(triggers.contains(&AlertTrigger::OutOfStock));
        assert!(triggers.contains(&AlertTrigger::PriceDrop));
    }

    #[test]
    fn deal_only_fires_when_nothing_else_triggered() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        let next = ObservationResult::diff(prior.product_id, Uuid::new_v4(), Utc::now(), payload("100.00", true, true), Some(&prior));
        let product = product_with_bounds("50.00", "150.00");
        let triggers = evaluate_triggers(&next, &product, Some((false, None, None)));
        assert_eq!(triggers, vec![AlertTrigger::Deal]);
    }

    #[test]
    fn first_observation_can_only_trigger_deal() {
        let first = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, true), None);
        let product = product_with_bounds("0.00", "0.00");
        let triggers = evaluate_triggers(&first, &product, Some((true, None, None)));
        // No prior -> no price/availability change flags set, so only `deal`
        // can have fired, and lowestEver forces it to LowestPriceEver since
        // bounds default to zero and 100.00 > 0.00 is false only if >.
        assert!(triggers.iter().all(|t| matches!(t, AlertTrigger::Deal | AlertTrigger::LowestPriceEver)));
    }

    #[test]
    fn sub_threshold_drop_without_any_change_flag_does_not_trigger() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        let next = ObservationResult::diff(prior.product_id, Uuid::new_v4(), Utc::now(), payload("99.00", true, false), Some(&prior));
        let product = product_with_bounds("50.00", "150.00");
        let triggers = evaluate_triggers(&next, &product, Some((false, Some(Decimal::new(500, 2)), Some(Decimal::new(10, 0)))));
        assert!(triggers.is_empty());
    }
}
