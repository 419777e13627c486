//! Persistence port for Task (C4).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{Lane, Task, TaskStatus};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task) -> Result<(), DatabaseError>;
    async fn get(&self, id: Uuid) -> Result<Option<Task>, DatabaseError>;
    async fn update(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Pending tasks ordered by `(priority, scheduled_time, id)`, limited to
    /// `limit` (§4.3 pulling policy, §5 ordering guarantee).
    async fn pending_ordered(&self, limit: u32) -> Result<Vec<Task>, DatabaseError>;

    /// Pending tasks for one retailer, ordered by priority, for the
    /// even-spread admission policy (§4.3).
    async fn pending_for_retailer(&self, retailer: &str, limit: u32) -> Result<Vec<Task>, DatabaseError>;

    /// Count of tasks currently `running`, grouped by retailer, to seed the
    /// in-memory retailer throttle on startup (§5).
    async fn running_counts_by_retailer(&self) -> Result<Vec<(String, u64)>, DatabaseError>;

    async fn count_by_status(&self, status: TaskStatus) -> Result<u64, DatabaseError>;
    async fn count_by_lane_and_status(&self, lane: Lane, status: TaskStatus) -> Result<u64, DatabaseError>;

    /// Tasks older than `cutoff` in a terminal state, for retention pruning
    /// (§6 environment knobs).
    async fn prunable_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError>;
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DatabaseError>;
}
