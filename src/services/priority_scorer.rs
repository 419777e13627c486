//! Priority Scorer (C2, §4.1): pure multi-factor priority computation.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::error::AnalyzerError;
use crate::domain::models::{MonitoringConfig, PriorityWeights, Product};
use crate::domain::ports::priority_scorer::ScoringContext;
use crate::domain::ports::PriorityScorer;

/// Default implementation of the Priority Scorer, parameterized by
/// [`PriorityWeights`] (§9 open question: weights are configuration, not
/// hard-coded).
#[derive(Debug, Clone)]
pub struct DefaultPriorityScorer {
    weights: PriorityWeights,
}

impl DefaultPriorityScorer {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    fn volatility(context: &ScoringContext) -> f64 {
        if context.observation_count_30d < 2 {
            return 5.0;
        }
        let (Some(min), Some(max)) = (context.price_min_30d, context.price_max_30d) else {
            return 5.0;
        };
        let min_f = min.to_f64().unwrap_or(0.0).max(0.01);
        let max_f = max.to_f64().unwrap_or(0.0);
        let v_pct = (max_f - min_f) / min_f * 100.0;
        let n = f64::from(context.observation_count_30d);
        let v_freq = f64::from(context.price_change_count_30d) / (n - 1.0);
        0.7 * (v_pct / 5.0).min(10.0) + 0.3 * v_freq * 10.0
    }

    fn popularity(context: &ScoringContext) -> f64 {
        if context.active_alert_rule_count == 0 && context.view_count == 0 {
            return 1.0;
        }
        let rules = f64::from(context.active_alert_rule_count) / 2.0;
        let views = f64::from(context.view_count) / 100.0;
        0.6 * rules.min(10.0) + 0.4 * views.min(10.0)
    }

    fn price_level(current_price: Decimal) -> f64 {
        let price = current_price.to_f64().unwrap_or(0.0);
        if price <= 0.0 {
            return 1.0;
        }
        (1.0 + 3.0 * price.max(1.0).log10()).min(10.0)
    }

    fn time_since_check(last_checked_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(last) = last_checked_at else {
            return 10.0;
        };
        let hours = (now - last).num_seconds() as f64 / 3600.0;
        (hours / 4.8).min(10.0)
    }

    fn manual_boost(config: &MonitoringConfig) -> f64 {
        config.manual_priority_boost.to_f64().unwrap_or(0.0).clamp(0.0, 10.0)
    }
}

impl PriorityScorer for DefaultPriorityScorer {
    fn score(
        &self,
        product: &Product,
        config: &MonitoringConfig,
        context: &ScoringContext,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AnalyzerError> {
        if let Some(last) = product.last_checked_at {
            if last > now {
                return Err(AnalyzerError::InvalidInput);
            }
        }

        let weighted = self.weights.volatility * Self::volatility(context)
            + self.weights.popularity * Self::popularity(context)
            + self.weights.price_level * Self::price_level(product.current_price)
            + self.weights.time_since_check * Self::time_since_check(product.last_checked_at, now)
            + self.weights.manual_boost * Self::manual_boost(config);

        let clamped = weighted.clamp(1.0, 10.0);
        // Lower numbers mean higher priority (§4.1).
        let priority = (11.0 - clamped).clamp(1.0, 10.0);
        Ok(Decimal::from_f64_retain(priority).unwrap_or(Decimal::new(55, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn product(price: &str) -> Product {
        let mut p = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
        p.current_price = price.parse().unwrap();
        p
    }

    #[test]
    fn never_checked_product_scores_high_priority() {
        let scorer = DefaultPriorityScorer::new(PriorityWeights::default());
        let p = product("50.00");
        let cfg = MonitoringConfig::new(Uuid::new_v4());
        let score = scorer.score(&p, &cfg, &ScoringContext::default(), Utc::now()).unwrap();
        // Never checked -> timeSinceCheck = 10, pulls priority toward 1.
        assert!(score < Decimal::new(55, 1));
    }

    #[test]
    fn score_is_deterministic() {
        let scorer = DefaultPriorityScorer::new(PriorityWeights::default());
        let p = product("199.99");
        let cfg = MonitoringConfig::new(Uuid::new_v4());
        let now = Utc::now();
        let ctx = ScoringContext {
            observation_count_30d: 10,
            price_change_count_30d: 3,
            price_min_30d: Some("150.00".parse().unwrap()),
            price_max_30d: Some("220.00".parse().unwrap()),
            active_alert_rule_count: 4,
            view_count: 50,
        };
        let a = scorer.score(&p, &cfg, &ctx, now).unwrap();
        let b = scorer.score(&p, &cfg, &ctx, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn score_always_clamped_to_one_ten() {
        let scorer = DefaultPriorityScorer::new(PriorityWeights::default());
        let mut cfg = MonitoringConfig::new(Uuid::new_v4());
        cfg.manual_priority_boost = Decimal::new(100, 0); // way out of range input
        let p = product("1.00");
        let score = scorer.score(&p, &cfg, &ScoringContext::default(), Utc::now()).unwrap();
        assert!(score >= Decimal::ONE && score <= Decimal::new(10, 0));
    }

    #[test]
    fn negative_time_differential_is_invalid_input() {
        let scorer = DefaultPriorityScorer::new(PriorityWeights::default());
        let mut p = product("10.00");
        let now = Utc::now();
        p.last_checked_at = Some(now + chrono::Duration::hours(1));
        let err = scorer.score(&p, &MonitoringConfig::new(p.id), &ScoringContext::default(), now).unwrap_err();
        assert_eq!(err, AnalyzerError::InvalidInput);
    }
}
