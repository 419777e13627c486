//! Per-product monitoring policy (frequency, thresholds, priority).

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often a product should be re-checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "hours")]
pub enum MonitoringFrequency {
    High,
    Normal,
    Low,
    Custom(u32),
}

impl MonitoringFrequency {
    /// Interval between scheduled checks for this frequency.
    pub fn interval(self) -> Duration {
        let hours = match self {
            Self::High => 4,
            Self::Normal => 12,
            Self::Low => 24,
            Self::Custom(h) => h.max(1),
        };
        Duration::hours(i64::from(hours))
    }
}

/// One monitoring policy, owned exclusively by its [`super::product::Product`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringConfig {
    pub id: Uuid,
    pub product_id: Uuid,
    pub frequency: MonitoringFrequency,
    pub active: bool,
    pub take_screenshot: bool,
    pub notify_on_any_change: bool,
    pub price_threshold_absolute: Option<Decimal>,
    pub price_threshold_pct: Option<Decimal>,
    /// Manual boost in `[0, 10]`, added as a raw factor score by the scorer.
    pub manual_priority_boost: Decimal,
    /// `[1, 10]`; lower is higher priority.
    pub priority_score: Decimal,
    pub last_monitored: Option<DateTime<Utc>>,
    pub next_scheduled: Option<DateTime<Utc>>,
}

impl MonitoringConfig {
    pub fn new(product_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            frequency: MonitoringFrequency::Normal,
            active: true,
            take_screenshot: false,
            notify_on_any_change: false,
            price_threshold_absolute: None,
            price_threshold_pct: None,
            manual_priority_boost: Decimal::ZERO,
            priority_score: Decimal::new(55, 1), // 5.5, neutral default
            last_monitored: None,
            next_scheduled: Some(Utc::now()),
        }
    }

    /// Advance `next_scheduled` from `last_monitored` per §3's invariant:
    /// `nextScheduled >= lastMonitored + interval(frequency)`.
    pub fn mark_monitored(&mut self, at: DateTime<Utc>) {
        self.last_monitored = Some(at);
        self.next_scheduled = Some(at + self.frequency.interval());
    }

    /// Whether this config's invariant currently holds; used in tests and
    /// consistency checks rather than on the hot path.
    pub fn invariant_holds(&self) -> bool {
        match (self.last_monitored, self.next_scheduled) {
            (Some(last), Some(next)) => next >= last + self.frequency.interval(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_monitored_advances_next_scheduled_by_interval() {
        let mut c = MonitoringConfig::new(Uuid::new_v4());
        c.frequency = MonitoringFrequency::High;
        let now = Utc::now();
        c.mark_monitored(now);
        assert_eq!(c.next_scheduled, Some(now + Duration::hours(4)));
        assert!(c.invariant_holds());
    }

    #[test]
    fn custom_frequency_uses_given_hours() {
        assert_eq!(
            MonitoringFrequency::Custom(6).interval(),
            Duration::hours(6)
        );
        assert_eq!(MonitoringFrequency::Custom(0).interval(), Duration::hours(1));
    }
}
