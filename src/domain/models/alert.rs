//! The materialized result of a matching [`super::alert_rule::AlertRule`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventType;

/// A price delta snapshot carried by an [`Alert`] for message rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDeltaSnapshot {
    pub previous_price: Option<Decimal>,
    pub current_price: Decimal,
    pub change_amount: Decimal,
    pub change_percentage: Decimal,
}

/// Generated from a triggering rule; user-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rule_id: Uuid,
    pub alert_type: EventType,
    pub message: String,
    pub delta: PriceDeltaSnapshot,
    /// Final priority after event-salience elevation (§4.5): `[1, 10]`.
    pub priority: u8,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Whether this alert's priority forces immediate delivery regardless of
    /// the user's batching preference (§4.5: priority >= 9).
    pub const fn forces_immediate(&self) -> bool {
        self.priority >= 9
    }
}
