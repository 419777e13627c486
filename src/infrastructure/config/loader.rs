use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid dispatcher.max_tasks_per_cycle: {0}. Must be at least 1")]
    InvalidMaxWorkers(u32),

    #[error("Invalid retailer ceiling for '{retailer}': {value}. Must be at least 1")]
    InvalidRetailerCeiling { retailer: String, value: u32 },

    #[error("Priority weights must sum to 1.0, got {0}")]
    InvalidPriorityWeight(f64),

    #[error("Invalid scheduler cadence: batch_size={batch_size}, run_interval_secs={run_interval_secs}. Both must be positive")]
    InvalidBatchCadence { batch_size: u32, run_interval_secs: u64 },

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid notification rate limit: {0}. Must be at least 1")]
    InvalidRateLimit(u32),

    #[error("Invalid retention window: {0} days. Must be at least 1")]
    InvalidRetentionDays(u32),
}

impl ConfigError {
    pub fn is_transient(&self) -> bool {
        false
    }

    pub fn is_permanent(&self) -> bool {
        true
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .price-monitor/config.yaml (project config, created by init)
    /// 3. .price-monitor/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PRICEMON_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".price-monitor/config.yaml"))
            .merge(Yaml::file(".price-monitor/local.yaml"))
            .merge(Env::prefixed("PRICEMON_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.dispatcher.max_tasks_per_cycle == 0 {
            return Err(ConfigError::InvalidMaxWorkers(config.dispatcher.max_tasks_per_cycle));
        }

        if config.dispatcher.default_retailer_ceiling == 0 {
            return Err(ConfigError::InvalidRetailerCeiling {
                retailer: "default".to_string(),
                value: config.dispatcher.default_retailer_ceiling,
            });
        }
        for (retailer, ceiling) in &config.dispatcher.retailer_ceilings {
            if *ceiling == 0 {
                return Err(ConfigError::InvalidRetailerCeiling {
                    retailer: retailer.clone(),
                    value: *ceiling,
                });
            }
        }

        let weight_sum = config.priority_weights.volatility
            + config.priority_weights.popularity
            + config.priority_weights.price_level
            + config.priority_weights.time_since_check
            + config.priority_weights.manual_boost;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidPriorityWeight(weight_sum));
        }

        if config.scheduler.batch_size == 0 || config.scheduler.run_interval_secs == 0 {
            return Err(ConfigError::InvalidBatchCadence {
                batch_size: config.scheduler.batch_size,
                run_interval_secs: config.scheduler.run_interval_secs,
            });
        }

        if config.notifications.per_user_channel_rate_per_hour == 0 {
            return Err(ConfigError::InvalidRateLimit(
                config.notifications.per_user_channel_rate_per_hour,
            ));
        }

        if config.retention.task_and_observation_days == 0 {
            return Err(ConfigError::InvalidRetentionDays(
                config.retention.task_and_observation_days,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));
    }

    #[test]
    fn validate_zero_max_workers() {
        let mut config = Config::default();
        config.dispatcher.max_tasks_per_cycle = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxWorkers(0))));
    }

    #[test]
    fn validate_zero_retailer_ceiling() {
        let mut config = Config::default();
        config.dispatcher.default_retailer_ceiling = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRetailerCeiling { value: 0, .. })
        ));
    }

    #[test]
    fn validate_unbalanced_priority_weights() {
        let mut config = Config::default();
        config.priority_weights.volatility = 0.9;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidPriorityWeight(_))));
    }

    #[test]
    fn validate_zero_batch_cadence() {
        let mut config = Config::default();
        config.scheduler.batch_size = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidBatchCadence { .. })));
    }

    #[test]
    fn validate_zero_rate_limit() {
        let mut config = Config::default();
        config.notifications.per_user_channel_rate_per_hour = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRateLimit(0))));
    }

    #[test]
    fn validate_zero_retention_days() {
        let mut config = Config::default();
        config.retention.task_and_observation_days = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRetentionDays(0))));
    }

    #[test]
    fn env_override_takes_precedence() {
        unsafe {
            env::set_var("PRICEMON_SCHEDULER__BATCH_SIZE", "42");
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("PRICEMON_").split("__"))
            .extract()
            .unwrap();

        assert_eq!(config.scheduler.batch_size, 42);

        unsafe {
            env::remove_var("PRICEMON_SCHEDULER__BATCH_SIZE");
        }
    }

    #[test]
    fn hierarchical_merging_overrides_in_order() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "scheduler:\n  batch_size: 50\n  run_interval_secs: 120").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "scheduler:\n  batch_size: 75").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.scheduler.batch_size, 75, "override should win");
        assert_eq!(
            config.scheduler.run_interval_secs, 120,
            "base value should persist when not overridden"
        );
    }
}
