//! Channel adapter interface: outbound notification transport (§6).

use async_trait::async_trait;

use crate::domain::models::NotificationDelivery;

/// Result of one channel `send` call (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub ok: bool,
    pub message_id: String,
    pub error: Option<String>,
}

/// A plug-in transport for one channel (email, push, in-app, ...). Receives
/// a Delivery (one per alert for immediate, one per batch for aggregated).
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn send(&self, delivery: &NotificationDelivery) -> SendOutcome;
}

/// Maps a [`crate::domain::models::Channel`] to its adapter.
pub trait ChannelRegistry: Send + Sync {
    fn resolve(&self, channel: crate::domain::models::Channel) -> Option<std::sync::Arc<dyn ChannelAdapter>>;
}
