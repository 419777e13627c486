//! Alert Rule Engine (C6, §4.5): matches events against user-defined
//! condition trees, elevates priority by event salience, and hands off to
//! the Notification Pipeline once per enabled channel.

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tracing::instrument;

use crate::domain::models::{Alert, AlertRule, BatchType, Event, EventType, FieldValue, PriceDeltaSnapshot};
use crate::domain::ports::{AlertRepository, AlertRuleRepository, NotificationDispatch};

pub struct AlertRuleEngine {
    rules: Arc<dyn AlertRuleRepository>,
    alerts: Arc<dyn AlertRepository>,
    dispatch: Arc<dyn NotificationDispatch>,
}

impl AlertRuleEngine {
    pub fn new(rules: Arc<dyn AlertRuleRepository>, alerts: Arc<dyn AlertRepository>, dispatch: Arc<dyn NotificationDispatch>) -> Self {
        Self { rules, alerts, dispatch }
    }

    /// §4.5 steps 1-4: filter, evaluate, elevate, persist, dispatch. Returns
    /// the alerts created for this event.
    #[instrument(skip(self, event), fields(event_type = ?event.event_type), err)]
    pub async fn handle_event(&self, event: &Event) -> Result<Vec<Alert>> {
        let candidates = self.rules.active_by_type(event.event_type).await.context("loading candidate rules")?;
        let mut created = Vec::new();

        for rule in candidates {
            if !rule.matches(event) || !rule.condition.evaluate(event) {
                continue;
            }

            let alert = build_alert(&rule, event);
            self.alerts.insert(&alert).await.context("persisting alert")?;

            let batch_type = if alert.forces_immediate() { BatchType::Immediate } else { rule.batch_type };

            for (channel, enabled) in &rule.channels {
                if !enabled {
                    continue;
                }
                self.dispatch.dispatch(&alert, *channel, batch_type).await.context("dispatching alert")?;
            }

            created.push(alert);
        }

        Ok(created)
    }
}

/// §4.5 "Triggering"/"Priority elevation": build the Alert and elevate its
/// priority by event salience before dispatch.
fn build_alert(rule: &AlertRule, event: &Event) -> Alert {
    let change_pct = field_decimal(event, "priceChangePercentage").unwrap_or(Decimal::ZERO);
    let change_amount = field_decimal(event, "priceChangeAmount").unwrap_or(Decimal::ZERO);
    let current_price = field_decimal(event, "currentPrice").unwrap_or(Decimal::ZERO);
    let previous_price = if change_amount == Decimal::ZERO { None } else { Some(current_price - change_amount) };

    let is_lowest_ever = event.event_type == EventType::PriceDropped && change_pct <= Decimal::new(-20, 0)
        || matches!(field_text(event, "trigger").as_deref(), Some("lowestPriceEver"));

    let priority = elevate_priority(rule.base_priority, change_pct, is_lowest_ever);

    Alert {
        id: uuid::Uuid::new_v4(),
        user_id: rule.user_id,
        product_id: event.product_id,
        rule_id: rule.id,
        alert_type: event.event_type,
        message: render_message(event.event_type, change_pct),
        delta: PriceDeltaSnapshot {
            previous_price,
            current_price,
            change_amount,
            change_percentage: change_pct,
        },
        priority,
        created_at: event.occurred_at,
    }
}

/// §4.5: drops of ≥20% add +2, ≥10% add +1; a lowest-ever signal forces 10.
fn elevate_priority(base: u8, change_pct: Decimal, is_lowest_ever: bool) -> u8 {
    if is_lowest_ever {
        return 10;
    }
    let abs_pct = change_pct.abs().to_f64().unwrap_or(0.0);
    let bump: u8 = if abs_pct >= 20.0 {
        2
    } else if abs_pct >= 10.0 {
        1
    } else {
        0
    };
    base.saturating_add(bump).min(10)
}

fn render_message(event_type: EventType, change_pct: Decimal) -> String {
    match event_type {
        EventType::PriceDropped => format!("Price dropped {:.1}%", change_pct.abs()),
        EventType::PriceIncreased => format!("Price increased {:.1}%", change_pct.abs()),
        EventType::AvailabilityChanged => "Availability changed".to_string(),
        EventType::PricePredictionMade => "New price prediction available".to_string(),
    }
}

fn field_decimal(event: &Event, key: &str) -> Option<Decimal> {
    match event.field(key) {
        Some(FieldValue::Decimal(d)) => Some(*d),
        _ => None,
    }
}

fn field_text(event: &Event, key: &str) -> Option<String> {
    match event.field(key) {
        Some(FieldValue::Text(t)) => Some(t.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_drop_elevates_priority_by_two() {
        assert_eq!(elevate_priority(5, Decimal::new(-25, 0), false), 7);
    }

    #[test]
    fn moderate_drop_elevates_priority_by_one() {
        assert_eq!(elevate_priority(5, Decimal::new(-12, 0), false), 6);
    }

    #[test]
    fn lowest_ever_forces_max_priority() {
        assert_eq!(elevate_priority(1, Decimal::ZERO, true), 10);
    }

    #[test]
    fn elevation_never_exceeds_ten() {
        assert_eq!(elevate_priority(9, Decimal::new(-30, 0), false), 10);
    }
}
