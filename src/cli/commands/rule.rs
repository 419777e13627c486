//! Implementation of `pricemon rule add|list`.

use anyhow::Result;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::{BatchTypeArg, EventTypeArg, OperatorArg};
use crate::cli::AppContext;
use crate::domain::models::{AlertRule, BatchType, ChannelMap, Condition, EventType, FieldValue, Operator};

fn map_event_type(e: EventTypeArg) -> EventType {
    match e {
        EventTypeArg::PriceDropped => EventType::PriceDropped,
        EventTypeArg::PriceIncreased => EventType::PriceIncreased,
        EventTypeArg::AvailabilityChanged => EventType::AvailabilityChanged,
        EventTypeArg::PricePredictionMade => EventType::PricePredictionMade,
    }
}

fn map_operator(o: OperatorArg) -> Operator {
    match o {
        OperatorArg::Eq => Operator::Eq,
        OperatorArg::Gt => Operator::Gt,
        OperatorArg::Lt => Operator::Lt,
        OperatorArg::Gte => Operator::Gte,
        OperatorArg::Lte => Operator::Lte,
    }
}

fn map_batch_type(b: BatchTypeArg) -> BatchType {
    match b {
        BatchTypeArg::Immediate => BatchType::Immediate,
        BatchTypeArg::Hourly => BatchType::Hourly,
        BatchTypeArg::Daily => BatchType::Daily,
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RuleOutput {
    pub rule_id: Uuid,
}

impl CommandOutput for RuleOutput {
    fn to_human(&self) -> String {
        format!("Rule created ({})", self.rule_id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RuleListOutput {
    pub rules: Vec<AlertRule>,
}

impl CommandOutput for RuleListOutput {
    fn to_human(&self) -> String {
        if self.rules.is_empty() {
            return "No rules found.".to_string();
        }
        let mut lines = vec![format!("{} rule(s):", self.rules.len())];
        for rule in &self.rules {
            lines.push(format!(
                "  {} type={:?} product={:?} priority={} batch={:?} active={}",
                rule.id, rule.rule_type, rule.product_id, rule.base_priority, rule.batch_type, rule.active
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Builds a single flat `Condition::Compare` from CLI flags. Arbitrary
/// nested And/Or/Not trees are only reachable by editing the stored rule
/// directly; the control-plane surface is optional and minimal (§6).
#[allow(clippy::too_many_arguments)]
pub async fn handle_add(
    ctx: &AppContext,
    user_id: Uuid,
    product_id: Option<Uuid>,
    event: EventTypeArg,
    field: String,
    op: OperatorArg,
    value: String,
    bool_value: bool,
    text: bool,
    priority: u8,
    batch: BatchTypeArg,
    json_mode: bool,
) -> Result<()> {
    let literal = if bool_value {
        FieldValue::Bool(value.parse()?)
    } else if text {
        FieldValue::Text(value)
    } else {
        FieldValue::Decimal(value.parse::<Decimal>()?)
    };

    let mut channels = ChannelMap::new();
    channels.insert(crate::domain::models::Channel::Email, true);
    channels.insert(crate::domain::models::Channel::Push, true);
    channels.insert(crate::domain::models::Channel::InApp, true);

    let rule = AlertRule {
        id: Uuid::new_v4(),
        user_id,
        product_id,
        rule_type: map_event_type(event),
        condition: Condition::Compare { field, op: map_operator(op), value: literal },
        channels,
        base_priority: priority.min(9),
        batch_type: map_batch_type(batch),
        active: true,
    };

    ctx.alert_rules.insert(&rule).await?;
    output(&RuleOutput { rule_id: rule.id }, json_mode);
    Ok(())
}

/// `AlertRuleRepository` only indexes by event type, not by user, so this
/// scans active rules across all event types and filters client-side.
pub async fn handle_list(ctx: &AppContext, user_id: Uuid, json_mode: bool) -> Result<()> {
    let mut rules = Vec::new();
    for event_type in
        [EventType::PriceDropped, EventType::PriceIncreased, EventType::AvailabilityChanged, EventType::PricePredictionMade]
    {
        rules.extend(ctx.alert_rules.active_by_type(event_type).await?.into_iter().filter(|r| r.user_id == user_id));
    }

    output(&RuleListOutput { rules }, json_mode);
    Ok(())
}
