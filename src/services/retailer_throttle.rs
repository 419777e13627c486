//! Per-retailer concurrency ceiling (§4.3, §5, §13), grounded on the same
//! shared-scope-map shape as [`crate::services::circuit_breaker`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::models::DispatcherConfig;

#[derive(Debug, Default)]
struct RetailerCounter {
    running: u32,
    ceiling: u32,
}

/// Tracks live `running` task counts per retailer and admits new work only
/// while under that retailer's ceiling.
pub struct RetailerThrottle {
    counters: RwLock<HashMap<String, RetailerCounter>>,
    default_ceiling: u32,
}

impl RetailerThrottle {
    pub fn new(config: &DispatcherConfig) -> Self {
        let counters = config
            .retailer_ceilings
            .iter()
            .map(|(retailer, ceiling)| (retailer.clone(), RetailerCounter { running: 0, ceiling: *ceiling }))
            .collect();
        Self { counters: RwLock::new(counters), default_ceiling: config.default_retailer_ceiling }
    }

    /// Seed running counts from durable storage on startup (§5 "survives
    /// worker crash").
    pub async fn seed(&self, running_counts: &[(String, u64)]) {
        let mut counters = self.counters.write().await;
        for (retailer, count) in running_counts {
            let entry = counters.entry(retailer.clone()).or_insert_with(|| RetailerCounter {
                running: 0,
                ceiling: self.default_ceiling,
            });
            entry.running = u32::try_from(*count).unwrap_or(u32::MAX);
        }
    }

    /// Admit a task for `retailer` if `running < ceiling`; returns whether
    /// it was admitted.
    pub async fn admit(&self, retailer: &str) -> bool {
        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(retailer.to_string())
            .or_insert_with(|| RetailerCounter { running: 0, ceiling: self.default_ceiling });
        if entry.running < entry.ceiling {
            entry.running += 1;
            true
        } else {
            false
        }
    }

    /// Release a slot once a task for `retailer` leaves the `running` state.
    pub async fn release(&self, retailer: &str) {
        let mut counters = self.counters.write().await;
        if let Some(entry) = counters.get_mut(retailer) {
            entry.running = entry.running.saturating_sub(1);
        }
    }

    pub async fn running_count(&self, retailer: &str) -> u32 {
        self.counters.read().await.get(retailer).map_or(0, |c| c.running)
    }

    pub async fn total_running(&self) -> u32 {
        self.counters.read().await.values().map(|c| c.running).sum()
    }
}

pub type SharedRetailerThrottle = Arc<RetailerThrottle>;

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DispatcherConfig {
        crate::domain::models::Config::default().dispatcher
    }

    #[tokio::test]
    async fn admits_up_to_ceiling_then_rejects() {
        let mut cfg = config();
        cfg.retailer_ceilings.insert("amazon".to_string(), 2);
        let throttle = RetailerThrottle::new(&cfg);
        assert!(throttle.admit("amazon").await);
        assert!(throttle.admit("amazon").await);
        assert!(!throttle.admit("amazon").await);
        assert_eq!(throttle.running_count("amazon").await, 2);
    }

    #[tokio::test]
    async fn release_frees_a_slot() {
        let mut cfg = config();
        cfg.retailer_ceilings.insert("fnac".to_string(), 1);
        let throttle = RetailerThrottle::new(&cfg);
        assert!(throttle.admit("fnac").await);
        assert!(!throttle.admit("fnac").await);
        throttle.release("fnac").await;
        assert!(throttle.admit("fnac").await);
    }

    #[tokio::test]
    async fn unknown_retailer_uses_default_ceiling() {
        let cfg = config();
        let throttle = RetailerThrottle::new(&cfg);
        for _ in 0..cfg.default_retailer_ceiling {
            assert!(throttle.admit("some-boutique").await);
        }
        assert!(!throttle.admit("some-boutique").await);
    }
}
