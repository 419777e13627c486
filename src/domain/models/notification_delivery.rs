//! One attempt to transport an Alert (or a batch) via one channel (§3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A first-class notification channel (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Push,
    InApp,
}

/// Monotonic delivery progression: `pending < sent < delivered < opened <
/// clicked`; `failed` is terminal except via explicit retry reset (§3, §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Failed,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery status cannot move backward from {from:?} to {to:?}")]
    Downgrade { from: DeliveryStatus, to: DeliveryStatus },
}

/// One attempt to transport one Alert (immediate) or one batch
/// (aggregated) over one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationDelivery {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel: Channel,
    pub alert_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub external_message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationDelivery {
    pub fn new_for_alert(user_id: Uuid, channel: Channel, alert_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            channel,
            alert_id: Some(alert_id),
            batch_id: None,
            status: DeliveryStatus::Pending,
            attempt: 0,
            max_attempts: 5,
            external_message_id: None,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    pub fn new_for_batch(user_id: Uuid, channel: Channel, batch_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            channel,
            alert_id: None,
            batch_id: Some(batch_id),
            status: DeliveryStatus::Pending,
            attempt: 0,
            max_attempts: 5,
            external_message_id: None,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    /// Advance the status, rejecting any non-forward move. `failed` is only
    /// reachable from `pending`/`sent` and is terminal; resetting it back to
    /// `pending` for a retry is a distinct, explicit operation
    /// ([`Self::reset_for_retry`]), not part of the forward progression.
    pub fn advance(&mut self, to: DeliveryStatus) -> Result<(), DeliveryError> {
        if to != DeliveryStatus::Failed && to <= self.status {
            return Err(DeliveryError::Downgrade { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    pub fn mark_sent(&mut self, external_message_id: impl Into<String>, at: DateTime<Utc>) -> Result<(), DeliveryError> {
        self.advance(DeliveryStatus::Sent)?;
        self.external_message_id = Some(external_message_id.into());
        self.sent_at = Some(at);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DeliveryStatus::Failed;
        self.error = Some(error.into());
    }

    /// Whether another retry attempt is permitted under the 5-attempt cap
    /// (§4.6).
    pub const fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Exponential backoff before the next retry attempt: `5 min * 2^n`
    /// (§4.6).
    pub fn retry_backoff(&self) -> chrono::Duration {
        chrono::Duration::minutes(5 * 2i64.pow(self.attempt))
    }

    /// Explicitly reset a failed delivery back to `pending` for a retry
    /// sweep, bumping the attempt counter.
    pub fn reset_for_retry(&mut self) {
        self.status = DeliveryStatus::Pending;
        self.attempt += 1;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_advances() {
        let mut d = NotificationDelivery::new_for_alert(Uuid::new_v4(), Channel::Email, Uuid::new_v4());
        d.mark_sent("ext-1", Utc::now()).unwrap();
        d.advance(DeliveryStatus::Delivered).unwrap();
        d.advance(DeliveryStatus::Opened).unwrap();
        assert!(d.advance(DeliveryStatus::Sent).is_err());
        assert!(d.advance(DeliveryStatus::Delivered).is_err());
    }

    #[test]
    fn retry_backoff_grows_exponentially() {
        let mut d = NotificationDelivery::new_for_alert(Uuid::new_v4(), Channel::Push, Uuid::new_v4());
        assert_eq!(d.retry_backoff(), chrono::Duration::minutes(5));
        d.attempt = 2;
        assert_eq!(d.retry_backoff(), chrono::Duration::minutes(20));
    }
}
