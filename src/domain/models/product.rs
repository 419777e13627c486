//! Product and retailer identity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked retailer product page.
///
/// Owns its [`super::monitoring_config::MonitoringConfig`] and its
/// [`super::observation::ObservationResult`] history exclusively; created by
/// external onboarding and mutated only by successful observations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub url: String,
    pub retailer: String,
    pub title: String,
    pub currency: String,
    pub current_price: Decimal,
    pub lowest_ever: Decimal,
    pub highest_ever: Decimal,
    pub is_available: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a brand-new product with no observation history yet.
    pub fn new(url: impl Into<String>, retailer: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            retailer: retailer.into(),
            title: String::new(),
            currency: currency.into(),
            current_price: Decimal::ZERO,
            lowest_ever: Decimal::ZERO,
            highest_ever: Decimal::ZERO,
            is_available: false,
            last_checked_at: None,
            created_at: now,
        }
    }

    /// Apply a fresh observation's price/availability to this product,
    /// widening the all-time low/high as needed.
    ///
    /// The first observation (`last_checked_at` still `None`) seeds
    /// `lowest_ever`/`highest_ever` from the observed price rather than
    /// widening against the zero default.
    pub fn apply_observation(&mut self, price: Decimal, available: bool, observed_at: DateTime<Utc>) {
        if self.last_checked_at.is_none() {
            self.lowest_ever = price;
            self.highest_ever = price;
        } else {
            if price < self.lowest_ever {
                self.lowest_ever = price;
            }
            if price > self.highest_ever {
                self.highest_ever = price;
            }
        }
        self.current_price = price;
        self.is_available = available;
        self.last_checked_at = Some(observed_at);
    }

    /// Host portion of the product URL, used for extractor routing (§6).
    pub fn host(&self) -> Option<&str> {
        self.url.split("://").nth(1)?.split('/').next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_seeds_lowest_and_highest() {
        let mut p = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
        p.apply_observation(Decimal::new(10000, 2), true, Utc::now());
        assert_eq!(p.lowest_ever, Decimal::new(10000, 2));
        assert_eq!(p.highest_ever, Decimal::new(10000, 2));
    }

    #[test]
    fn subsequent_observation_widens_bounds() {
        let mut p = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
        let t0 = Utc::now();
        p.apply_observation(Decimal::new(10000, 2), true, t0);
        p.apply_observation(Decimal::new(8800, 2), true, t0);
        p.apply_observation(Decimal::new(12000, 2), true, t0);
        assert_eq!(p.lowest_ever, Decimal::new(8800, 2));
        assert_eq!(p.highest_ever, Decimal::new(12000, 2));
        assert_eq!(p.current_price, Decimal::new(12000, 2));
    }

    #[test]
    fn host_extraction() {
        let p = Product::new("https://www.amazon.fr/dp/ABC123", "amazon", "EUR");
        assert_eq!(p.host(), Some("www.amazon.fr"));
    }
}
