//! Application configuration, loaded hierarchically by
//! [`crate::infrastructure::config::ConfigLoader`] (§10.3, §11).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub priority_weights: PriorityWeights,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            priority_weights: PriorityWeights::default(),
            notifications: NotificationConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path(), max_connections: default_max_connections() }
    }
}

fn default_db_path() -> String {
    ".price-monitor/price-monitor.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    pub log_dir: Option<String>,
    #[serde(default = "default_true")]
    pub enable_stdout: bool,
    #[serde(default)]
    pub rotation: RotationPolicy,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Daily
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

const fn default_true() -> bool {
    true
}

/// Cadences for the periodic drivers (§5): scheduler, dispatch,
/// priority-refresh, stats-aggregation, notification-sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_scheduler_interval_secs")]
    pub run_interval_secs: u64,
    #[serde(default = "default_priority_refresh_interval_secs")]
    pub priority_refresh_interval_secs: u64,
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_scheduler_batch_size(),
            run_interval_secs: default_scheduler_interval_secs(),
            priority_refresh_interval_secs: default_priority_refresh_interval_secs(),
            stats_interval_secs: default_stats_interval_secs(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

const fn default_scheduler_batch_size() -> u32 {
    100
}
const fn default_scheduler_interval_secs() -> u64 {
    300 // 5 min
}
const fn default_priority_refresh_interval_secs() -> u64 {
    6 * 3600 // 6 h
}
const fn default_stats_interval_secs() -> u64 {
    3600 // 1 h
}
const fn default_max_per_hour() -> u32 {
    50
}

/// Per-retailer concurrency ceilings and dispatch cadence (§4.3, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    #[serde(default = "default_dispatch_interval_secs")]
    pub run_interval_secs: u64,
    #[serde(default = "default_max_tasks_per_cycle")]
    pub max_tasks_per_cycle: u32,
    #[serde(default = "default_retailer_ceilings")]
    pub retailer_ceilings: HashMap<String, u32>,
    #[serde(default = "default_retailer_ceiling")]
    pub default_retailer_ceiling: u32,
    #[serde(default = "default_soft_deadline_secs")]
    pub soft_deadline_secs: u64,
    #[serde(default = "default_hard_deadline_secs")]
    pub hard_deadline_secs: u64,
    #[serde(default = "default_extractor_timeout_secs")]
    pub extractor_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            run_interval_secs: default_dispatch_interval_secs(),
            max_tasks_per_cycle: default_max_tasks_per_cycle(),
            retailer_ceilings: default_retailer_ceilings(),
            default_retailer_ceiling: default_retailer_ceiling(),
            soft_deadline_secs: default_soft_deadline_secs(),
            hard_deadline_secs: default_hard_deadline_secs(),
            extractor_timeout_secs: default_extractor_timeout_secs(),
        }
    }
}

const fn default_dispatch_interval_secs() -> u64 {
    120 // 2 min
}
const fn default_max_tasks_per_cycle() -> u32 {
    200
}
fn default_retailer_ceilings() -> HashMap<String, u32> {
    HashMap::from([
        ("amazon".to_string(), 20),
        ("fnac".to_string(), 10),
        ("darty".to_string(), 10),
        ("boulanger".to_string(), 10),
    ])
}
const fn default_retailer_ceiling() -> u32 {
    5
}
const fn default_soft_deadline_secs() -> u64 {
    300 // 5 min
}
const fn default_hard_deadline_secs() -> u64 {
    600 // 10 min
}
const fn default_extractor_timeout_secs() -> u64 {
    30
}

/// Priority-scorer factor weights (§4.1, §9 open question).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PriorityWeights {
    #[serde(default = "default_w_volatility")]
    pub volatility: f64,
    #[serde(default = "default_w_popularity")]
    pub popularity: f64,
    #[serde(default = "default_w_price_level")]
    pub price_level: f64,
    #[serde(default = "default_w_time_since_check")]
    pub time_since_check: f64,
    #[serde(default = "default_w_manual_boost")]
    pub manual_boost: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            volatility: default_w_volatility(),
            popularity: default_w_popularity(),
            price_level: default_w_price_level(),
            time_since_check: default_w_time_since_check(),
            manual_boost: default_w_manual_boost(),
        }
    }
}

const fn default_w_volatility() -> f64 {
    0.35
}
const fn default_w_popularity() -> f64 {
    0.25
}
const fn default_w_price_level() -> f64 {
    0.15
}
const fn default_w_time_since_check() -> f64 {
    0.15
}
const fn default_w_manual_boost() -> f64 {
    0.10
}

/// Per-channel throttle and retry settings (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    #[serde(default = "default_per_user_channel_rate_per_hour")]
    pub per_user_channel_rate_per_hour: u32,
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_daily_summary_hour")]
    pub default_daily_summary_hour: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            per_user_channel_rate_per_hour: default_per_user_channel_rate_per_hour(),
            dedup_window_secs: default_dedup_window_secs(),
            max_delivery_attempts: default_max_delivery_attempts(),
            sweep_interval_secs: default_sweep_interval_secs(),
            default_daily_summary_hour: default_daily_summary_hour(),
        }
    }
}

const fn default_per_user_channel_rate_per_hour() -> u32 {
    100
}
const fn default_dedup_window_secs() -> u64 {
    3600
}
const fn default_max_delivery_attempts() -> u32 {
    5
}
const fn default_sweep_interval_secs() -> u64 {
    180
}
const fn default_daily_summary_hour() -> u32 {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetentionConfig {
    #[serde(default = "default_retention_window_days")]
    pub task_and_observation_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { task_and_observation_days: default_retention_window_days() }
    }
}

const fn default_retention_window_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let c = Config::default();
        assert_eq!(c.dispatcher.retailer_ceilings.get("amazon"), Some(&20));
        assert_eq!(c.dispatcher.default_retailer_ceiling, 5);
        assert!((c.priority_weights.volatility
            + c.priority_weights.popularity
            + c.priority_weights.price_level
            + c.priority_weights.time_since_check
            + c.priority_weights.manual_boost
            - 1.0)
            .abs()
            < 1e-9);
    }
}
