//! Hand-off port from the Alert Rule Engine (C6) to the Notification
//! Pipeline (C7), keeping the two components decoupled behind a trait rather
//! than a direct service-to-service dependency.

use async_trait::async_trait;

use crate::domain::error::NotificationError;
use crate::domain::models::{Alert, BatchType, Channel};

#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    /// Route one matched alert to one enabled channel, respecting the
    /// rule's aggregation preference (§4.5, §4.6).
    async fn dispatch(&self, alert: &Alert, channel: Channel, batch_type: BatchType) -> Result<(), NotificationError>;
}
