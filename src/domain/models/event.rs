//! Transient change signals produced by the Result Analyzer (§3, §4.4).
//!
//! Events have no persistent identity; they are published on the
//! [`crate::services::event_bus::EventBus`] and consumed by the Alert Rule
//! Engine, never read back from storage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The kind of change an [`Event`] describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PriceDropped,
    PriceIncreased,
    AvailabilityChanged,
    PricePredictionMade,
}

/// A single scalar field value in an event's flat key-value view, used by
/// the Alert Rule Engine's condition-tree evaluator (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Decimal(Decimal),
    Bool(bool),
    Text(String),
}

/// A transient signal produced by the Analyzer describing a change of
/// interest in one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub event_type: EventType,
    pub product_id: Uuid,
    pub observation_result_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub fields: HashMap<String, FieldValue>,
}

impl Event {
    pub fn new(event_type: EventType, product_id: Uuid, observation_result_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            product_id,
            observation_result_id,
            occurred_at: Utc::now(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Look up a field by name; an absent field is `None`, which the
    /// condition evaluator treats as "false", not an error (§8).
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
