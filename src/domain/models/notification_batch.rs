//! Aggregated hourly/daily groupings of alerts for one (user, channel) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notification_delivery::Channel;

/// How a rule's notifications are aggregated before delivery (§4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    Immediate,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Sent,
    Failed,
}

/// Holds zero or more Alerts for one (user, channel, batch type) tuple.
/// Items are immutable once the batch is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationBatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel: Channel,
    pub batch_type: BatchType,
    pub alert_ids: Vec<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub status: BatchStatus,
}

impl NotificationBatch {
    pub fn open(user_id: Uuid, channel: Channel, batch_type: BatchType, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            channel,
            batch_type,
            alert_ids: Vec::new(),
            scheduled_for,
            status: BatchStatus::Pending,
        }
    }

    /// Append an alert id; a no-op once the batch has left `pending`.
    pub fn push(&mut self, alert_id: Uuid) -> bool {
        if self.status != BatchStatus::Pending {
            return false;
        }
        self.alert_ids.push(alert_id);
        true
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == BatchStatus::Pending && self.scheduled_for <= now
    }

    /// Reset a failed batch for a rerun; the caller is responsible for
    /// resetting the batch's embedded deliveries first (§4.6).
    pub fn reset(&mut self) {
        if self.status == BatchStatus::Failed {
            self.status = BatchStatus::Pending;
        }
    }
}

/// Start of the next wall-clock (UTC) hour boundary, per §9's adopted
/// calendar-boundary semantics for hourly batching.
pub fn next_hour_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::Timelike;
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + chrono::Duration::hours(1)
}

/// `scheduledFor` for a daily batch: `daily_summary_hour` today if still
/// ahead, else tomorrow (§4.6).
pub fn next_daily_boundary(now: DateTime<Utc>, daily_summary_hour: u32) -> DateTime<Utc> {
    use chrono::Timelike;
    let hour = daily_summary_hour.min(23);
    let today_target = now
        .with_hour(hour)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_hour_boundary_rounds_up() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 14, 35, 0).unwrap();
        let next = next_hour_boundary(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 27, 15, 0, 0).unwrap());
    }

    #[test]
    fn push_rejected_once_batch_left_pending() {
        let mut b = NotificationBatch::open(Uuid::new_v4(), Channel::Email, BatchType::Hourly, Utc::now());
        assert!(b.push(Uuid::new_v4()));
        b.status = BatchStatus::Sent;
        assert!(!b.push(Uuid::new_v4()));
    }
}
