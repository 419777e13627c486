//! Periodically recomputed aggregate read by the control-plane surface (§3, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::task::TaskStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringStats {
    pub computed_at: DateTime<Utc>,
    pub products_tracked: u64,
    pub active_configs: u64,
    pub tasks_by_status: HashMap<TaskStatus, u64>,
    pub average_priority_score: f64,
    pub alerts_fired_last_window: u64,
}

impl MonitoringStats {
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            computed_at,
            products_tracked: 0,
            active_configs: 0,
            tasks_by_status: HashMap::new(),
            average_priority_score: 0.0,
            alerts_fired_last_window: 0,
        }
    }
}
