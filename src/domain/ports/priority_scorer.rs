//! Port for the Priority Scorer (C2, §4.1).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::error::AnalyzerError;
use crate::domain::models::{MonitoringConfig, Product};

/// History facts the scorer needs about a product that don't live on
/// [`Product`]/[`MonitoringConfig`] themselves, gathered from the
/// observation and alert-rule stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringContext {
    pub observation_count_30d: u32,
    pub price_change_count_30d: u32,
    pub price_min_30d: Option<rust_decimal::Decimal>,
    pub price_max_30d: Option<rust_decimal::Decimal>,
    pub active_alert_rule_count: u32,
    pub view_count: u32,
}

/// Computes per-product check priority from history + config (§4.1).
///
/// Pure and deterministic: identical inputs must yield identical outputs.
#[async_trait]
pub trait PriorityScorer: Send + Sync {
    /// `[1, 10]`, lower is higher priority.
    fn score(
        &self,
        product: &Product,
        config: &MonitoringConfig,
        context: &ScoringContext,
        now: DateTime<Utc>,
    ) -> Result<rust_decimal::Decimal, AnalyzerError>;
}
