//! Event bus (§4.4 step 5, §14): a minimal in-process fan-out from the
//! Result Analyzer to the Alert Rule Engine, trimmed down from the original
//! general-purpose `UnifiedEvent`/`EventPayload` publish/subscribe service to
//! the four event types this domain needs.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::models::Event;

/// Publishes [`Event`]s to any number of subscribers. Lagging subscribers
/// drop the oldest events rather than blocking the publisher.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventType;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let event = Event::new(EventType::PriceDropped, Uuid::new_v4(), Uuid::new_v4());
        bus.publish(event.clone());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(Event::new(EventType::PriceIncreased, Uuid::new_v4(), Uuid::new_v4()));
    }
}
