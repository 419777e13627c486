//! Normalized extractor output and the diff computed against prior state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Raw, normalized output of one successful Extractor call (§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationPayload {
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub is_deal: bool,
    pub screenshots: HashMap<String, String>,
    pub metadata: HashMap<String, String>,
}

/// The kind of alert a completed observation may trigger (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    OutOfStock,
    BackInStock,
    PriceDrop,
    LowestPriceEver,
    Deal,
}

/// The diff between a new observation and the product's prior state,
/// persisted once per completed task that produced data (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationResult {
    pub id: Uuid,
    pub product_id: Uuid,
    pub task_id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub previous_price: Option<Decimal>,
    pub current_price: Decimal,
    pub price_changed: bool,
    pub price_change_amount: Decimal,
    pub price_change_percentage: Decimal,
    pub previously_available: Option<bool>,
    pub currently_available: bool,
    pub availability_changed: bool,
    pub is_deal: bool,
    pub raw_payload: ObservationPayload,
    pub triggers: Vec<AlertTrigger>,
}

impl ObservationResult {
    /// Build the diff of `payload` against `prior`, per §4.4 step 2.
    ///
    /// `prior == None` means this is the product's first-ever observation:
    /// no change flags are set regardless of the payload's content.
    pub fn diff(
        product_id: Uuid,
        task_id: Uuid,
        observed_at: DateTime<Utc>,
        payload: ObservationPayload,
        prior: Option<&ObservationResult>,
    ) -> Self {
        let previous_price = prior.map(|p| p.current_price);
        let previously_available = prior.map(|p| p.currently_available);

        let price_change_amount = previous_price.map_or(Decimal::ZERO, |prev| payload.price - prev);
        let price_change_percentage = match previous_price {
            Some(prev) if prev > Decimal::ZERO => (price_change_amount / prev) * Decimal::from(100),
            _ => Decimal::ZERO,
        };
        let price_changed = prior.is_some() && previous_price != Some(payload.price);
        let availability_changed =
            prior.is_some() && previously_available != Some(payload.in_stock);

        Self {
            id: Uuid::new_v4(),
            product_id,
            task_id,
            observed_at,
            previous_price,
            current_price: payload.price,
            price_changed,
            price_change_amount,
            price_change_percentage,
            previously_available,
            currently_available: payload.in_stock,
            availability_changed,
            is_deal: payload.is_deal,
            raw_payload: payload,
            triggers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn first_observation_has_no_change_flags() {
        let r = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        assert!(!r.price_changed);
        assert!(!r.availability_changed);
        assert_eq!(r.previous_price, None);
    }

    #[test]
    fn zero_previous_price_defines_percentage_as_zero() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("0.00", true, false), None);
        let next = ObservationResult::diff(
            prior.product_id,
            Uuid::new_v4(),
            Utc::now(),
            payload("10.00", true, false),
            Some(&prior),
        );
        assert_eq!(next.price_change_percentage, Decimal::ZERO);
        assert_eq!(next.price_change_amount, Decimal::new(1000, 2));
    }

    #[test]
    fn price_drop_percentage_is_negative() {
        let prior = ObservationResult::diff(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), payload("100.00", true, false), None);
        let next = ObservationResult::diff(
            prior.product_id,
            Uuid::new_v4(),
            Utc::now(),
            payload("94.00", true, false),
            Some(&prior),
        );
        assert_eq!(next.price_change_percentage, Decimal::new(-600, 2));
    }
}
