//! User-defined condition trees over event fields (§4.5).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{Event, EventType, FieldValue};
use super::notification_batch::BatchType;
use super::notification_delivery::Channel;

/// A comparison operator applied to an event field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// A tagged-union boolean expression tree over an event's flat field map
/// (§4.5, §9 "dynamic rule conditions").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        field: String,
        op: Operator,
        value: FieldValue,
    },
}

impl Condition {
    /// Recursively fold this condition over `event`'s field map.
    ///
    /// A `Compare` leaf referencing a field absent from the event evaluates
    /// to `false` rather than erroring (§8 boundary case). Comparisons
    /// across mismatched `FieldValue` variants (e.g. comparing a decimal
    /// field against a text literal) also evaluate to `false`.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.evaluate(event)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(event)),
            Self::Not(inner) => !inner.evaluate(event),
            Self::Compare { field, op, value } => {
                let Some(actual) = event.field(field) else {
                    return false;
                };
                compare(actual, *op, value)
            }
        }
    }
}

fn compare(actual: &FieldValue, op: Operator, literal: &FieldValue) -> bool {
    match (actual, literal) {
        (FieldValue::Decimal(a), FieldValue::Decimal(b)) => match op {
            Operator::Eq => a == b,
            Operator::Gt => a > b,
            Operator::Lt => a < b,
            Operator::Gte => a >= b,
            Operator::Lte => a <= b,
        },
        (FieldValue::Bool(a), FieldValue::Bool(b)) => op == Operator::Eq && a == b,
        (FieldValue::Text(a), FieldValue::Text(b)) => match op {
            Operator::Eq => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// A channel-enable map: which [`Channel`]s an [`AlertRule`] should dispatch
/// notifications to when it fires.
pub type ChannelMap = std::collections::HashMap<Channel, bool>;

/// A user-scoped, optionally product-scoped rule matched against events of
/// one [`EventType`]. Immutable except via explicit user update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Option<Uuid>,
    pub rule_type: EventType,
    pub condition: Condition,
    pub channels: ChannelMap,
    /// Base priority before event-salience elevation (§4.5).
    pub base_priority: u8,
    /// User's preferred aggregation cadence; overridden to `Immediate` when
    /// the elevated priority reaches 9 (§4.5).
    pub batch_type: BatchType,
    pub active: bool,
}

impl AlertRule {
    /// Whether this rule applies to `event`: type must match, and either the
    /// rule is global (no product scope) or the product matches.
    pub fn matches(&self, event: &Event) -> bool {
        self.active
            && self.rule_type == event.event_type
            && self.product_id.map_or(true, |p| p == event.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn absent_field_evaluates_false_not_error() {
        let event = Event::new(EventType::PriceDropped, Uuid::new_v4(), Uuid::new_v4());
        let cond = Condition::Compare {
            field: "priceChangePercentage".into(),
            op: Operator::Lte,
            value: FieldValue::Decimal(Decimal::new(-5, 0)),
        };
        assert!(!cond.evaluate(&event));
    }

    #[test]
    fn and_or_not_short_circuit_correctly() {
        let event = Event::new(EventType::PriceDropped, Uuid::new_v4(), Uuid::new_v4())
            .with_field("priceChangePercentage", FieldValue::Decimal(Decimal::new(-10, 0)));
        let threshold = Condition::Compare {
            field: "priceChangePercentage".into(),
            op: Operator::Lte,
            value: FieldValue::Decimal(Decimal::new(-5, 0)),
        };
        let not_deal = Condition::Not(Box::new(Condition::Compare {
            field: "isDeal".into(),
            op: Operator::Eq,
            value: FieldValue::Bool(true),
        }));
        let tree = Condition::And(vec![threshold, not_deal]);
        assert!(tree.evaluate(&event));
    }

    #[test]
    fn rule_product_scope_filters_unrelated_products() {
        let owner = Uuid::new_v4();
        let product = Uuid::new_v4();
        let other_product = Uuid::new_v4();
        let rule = AlertRule {
            id: Uuid::new_v4(),
            user_id: owner,
            product_id: Some(product),
            rule_type: EventType::PriceDropped,
            condition: Condition::Compare {
                field: "x".into(),
                op: Operator::Eq,
                value: FieldValue::Bool(true),
            },
            channels: ChannelMap::new(),
            base_priority: 5,
            batch_type: BatchType::Immediate,
            active: true,
        };
        let event = Event::new(EventType::PriceDropped, other_product, Uuid::new_v4());
        assert!(!rule.matches(&event));
    }
}
