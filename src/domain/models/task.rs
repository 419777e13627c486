//! The unit of work to fetch and re-evaluate one product (§3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a [`Task`].
///
/// ```text
///  pending ──admit──► scheduled ──claim──► running ──ok──► completed
///     ▲                                        │
///     │                                        ├──err, retries<max──► pending
///     │                                        └──err, retries=max──► failed
///     └──── cancel from any non-terminal ──► cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states never re-enter any other state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> to` is a legal state-machine edge.
    pub const fn can_transition_to(self, to: Self) -> bool {
        use TaskStatus::{Cancelled, Completed, Failed, Pending, Running, Scheduled};
        match (self, to) {
            (Pending, Scheduled | Cancelled) => true,
            (Scheduled, Running | Cancelled) => true,
            (Running, Completed | Pending | Failed | Cancelled) => true,
            _ => false,
        }
    }
}

/// Which priority lane a task belongs to, derived from its numeric priority.
///
/// `high` = 1..=3, `normal` = 4..=7, `low` = 8..=10 (§4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    High,
    Normal,
    Low,
}

impl Lane {
    pub const fn from_priority(priority: u8) -> Self {
        match priority {
            0..=3 => Self::High,
            4..=7 => Self::Normal,
            _ => Self::Low,
        }
    }

    /// Base retry backoff for the lane, per §4.3: `base * 2^n`.
    pub const fn backoff_base_secs(self) -> u64 {
        match self {
            Self::High => 30,
            Self::Normal => 60,
            Self::Low => 120,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("priority {0} out of range [1, 10]")]
    InvalidPriority(u8),
    #[error("task cannot be retried, max retries ({0}) reached")]
    MaxRetriesExceeded(u32),
}

/// A unit of work to fetch and re-evaluate one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub product_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    /// `[1, 10]`; lower is higher priority.
    pub priority: u8,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// References the `ObservationResult` produced by a completed task.
    pub observation_result_id: Option<Uuid>,
}

impl Task {
    pub fn new(product_id: Uuid, priority: u8, scheduled_time: DateTime<Utc>) -> Result<Self, TaskError> {
        if priority < 1 || priority > 10 {
            return Err(TaskError::InvalidPriority(priority));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            scheduled_time,
            priority,
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries: 3,
            started_at: None,
            completed_at: None,
            error: None,
            observation_result_id: None,
        })
    }

    pub const fn lane(&self) -> Lane {
        Lane::from_priority(self.priority)
    }

    fn transition(&mut self, to: TaskStatus) -> Result<(), TaskError> {
        if !self.status.can_transition_to(to) {
            return Err(TaskError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    pub fn admit(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::Scheduled)
    }

    pub fn claim(&mut self, at: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Running)?;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>, observation_result_id: Uuid) -> Result<(), TaskError> {
        self.transition(TaskStatus::Completed)?;
        self.completed_at = Some(at);
        self.observation_result_id = Some(observation_result_id);
        Ok(())
    }

    /// Report a failure: re-queues with `retry_count` bumped if under the
    /// limit, otherwise moves to the terminal `failed` state.
    pub fn fail(&mut self, at: DateTime<Utc>, error: impl Into<String>) -> Result<(), TaskError> {
        self.error = Some(error.into());
        if self.retry_count < self.max_retries {
            self.retry_count += 1;
            self.transition(TaskStatus::Pending)
        } else {
            self.transition(TaskStatus::Failed)?;
            self.completed_at = Some(at);
            Ok(())
        }
    }

    /// Terminal failure bypassing retry, for semantic/fatal errors that must
    /// not retry (§7).
    pub fn fail_terminal(&mut self, at: DateTime<Utc>, error: impl Into<String>) -> Result<(), TaskError> {
        self.error = Some(error.into());
        self.transition(TaskStatus::Failed)?;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Cancel from any non-terminal state; a no-op on already-terminal tasks.
    pub fn cancel(&mut self) {
        if !self.status.is_terminal() {
            self.status = TaskStatus::Cancelled;
        }
    }

    /// Backoff duration before the next retry attempt, per lane (§4.3).
    pub fn retry_backoff(&self) -> chrono::Duration {
        let base = self.lane().backoff_base_secs();
        let secs = base * 2u64.pow(self.retry_count);
        chrono::Duration::seconds(secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut t = Task::new(Uuid::new_v4(), 2, Utc::now()).unwrap();
        assert_eq!(t.lane(), Lane::High);
        t.admit().unwrap();
        t.claim(Utc::now()).unwrap();
        t.complete(Utc::now(), Uuid::new_v4()).unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
    }

    #[test]
    fn retry_then_exhaustion() {
        let mut t = Task::new(Uuid::new_v4(), 5, Utc::now()).unwrap();
        t.max_retries = 1;
        t.admit().unwrap();
        t.claim(Utc::now()).unwrap();
        t.fail(Utc::now(), "boom").unwrap();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.retry_count, 1);

        t.admit().unwrap();
        t.claim(Utc::now()).unwrap();
        t.fail(Utc::now(), "boom again").unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn retry_count_never_exceeds_max() {
        let mut t = Task::new(Uuid::new_v4(), 5, Utc::now()).unwrap();
        for _ in 0..10 {
            if t.status.is_terminal() {
                break;
            }
            let _ = t.admit();
            let _ = t.claim(Utc::now());
            let _ = t.fail(Utc::now(), "err");
        }
        assert!(t.retry_count <= t.max_retries);
    }

    #[test]
    fn cancel_from_running_is_terminal_and_cancel_again_is_noop() {
        let mut t = Task::new(Uuid::new_v4(), 5, Utc::now()).unwrap();
        t.admit().unwrap();
        t.claim(Utc::now()).unwrap();
        t.cancel();
        assert_eq!(t.status, TaskStatus::Cancelled);
        t.cancel();
        assert_eq!(t.status, TaskStatus::Cancelled);
    }

    #[test]
    fn invalid_priority_rejected() {
        assert!(Task::new(Uuid::new_v4(), 0, Utc::now()).is_err());
        assert!(Task::new(Uuid::new_v4(), 11, Utc::now()).is_err());
    }

    #[test]
    fn retry_backoff_doubles_per_lane_base() {
        let mut t = Task::new(Uuid::new_v4(), 1, Utc::now()).unwrap();
        assert_eq!(t.retry_backoff(), chrono::Duration::seconds(30));
        t.retry_count = 2;
        assert_eq!(t.retry_backoff(), chrono::Duration::seconds(120));
    }
}
