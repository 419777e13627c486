//! Notification Pipeline (C7, §4.6): immediate/hourly/daily batching,
//! per-(user, channel) throttling, delivery retry, and engagement tracking.

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::clock::DefaultClock;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::error::NotificationError;
use crate::domain::models::{
    Alert, BatchType, Channel, EngagementEvent, EngagementKind, NotificationBatch, NotificationConfig,
    NotificationDelivery,
};
use crate::domain::models::notification_batch::{next_daily_boundary, next_hour_boundary};
use crate::domain::ports::{
    ChannelRegistry, Clock, EngagementRepository, NotificationBatchRepository, NotificationDeliveryRepository,
    NotificationDispatch,
};

type ThrottleKey = (Uuid, Channel);
type Throttle = RateLimiter<ThrottleKey, DefaultKeyedStateStore<ThrottleKey>, DefaultClock>;

pub struct NotificationPipeline {
    deliveries: Arc<dyn NotificationDeliveryRepository>,
    batches: Arc<dyn NotificationBatchRepository>,
    engagement: Arc<dyn EngagementRepository>,
    channels: Arc<dyn ChannelRegistry>,
    clock: Arc<dyn Clock>,
    config: NotificationConfig,
    throttle: Throttle,
}

impl NotificationPipeline {
    pub fn new(
        deliveries: Arc<dyn NotificationDeliveryRepository>,
        batches: Arc<dyn NotificationBatchRepository>,
        engagement: Arc<dyn EngagementRepository>,
        channels: Arc<dyn ChannelRegistry>,
        clock: Arc<dyn Clock>,
        config: NotificationConfig,
    ) -> Self {
        let per_hour = NonZeroU32::new(config.per_user_channel_rate_per_hour).unwrap_or(NonZeroU32::new(1).unwrap());
        let throttle = RateLimiter::keyed(Quota::per_hour(per_hour));
        Self { deliveries, batches, engagement, channels, clock, config, throttle }
    }

    /// Periodic sweep (§4.6): dispatch due batches and retry retryable
    /// failed deliveries.
    #[instrument(skip(self), err)]
    pub async fn run_sweep(&self) -> Result<u32> {
        let now = self.clock.now();
        let mut dispatched = 0u32;

        for mut batch in self.batches.due(now).await.context("loading due batches")? {
            if let Err(err) = self.send_batch(&mut batch).await {
                warn!(batch_id = %batch.id, error = %err, "batch dispatch failed");
            } else {
                dispatched += 1;
            }
        }

        for mut delivery in self.deliveries.failed_retryable(now).await.context("loading retryable deliveries")? {
            delivery.reset_for_retry();
            self.deliveries.update(&delivery).await.context("persisting retry reset")?;
        }

        Ok(dispatched)
    }

    async fn send_batch(&self, batch: &mut NotificationBatch) -> Result<()> {
        let mut delivery = NotificationDelivery::new_for_batch(batch.user_id, batch.channel, batch.id);
        self.send_delivery(&mut delivery).await?;
        batch.status = crate::domain::models::BatchStatus::Sent;
        self.batches.update(batch).await.context("persisting sent batch")?;
        self.engagement_record_sent(batch.user_id, batch.channel, batch_type_or(batch)).await;
        Ok(())
    }

    async fn send_delivery(&self, delivery: &mut NotificationDelivery) -> Result<(), NotificationError> {
        let adapter = self
            .channels
            .resolve(delivery.channel)
            .ok_or_else(|| NotificationError::ChannelNotRegistered(format!("{:?}", delivery.channel)))?;

        let outcome = adapter.send(delivery).await;
        if outcome.ok {
            delivery
                .mark_sent(outcome.message_id, self.clock.now())
                .map_err(|_| NotificationError::SendFailed("status transition rejected".to_string()))?;
        } else {
            delivery.mark_failed(outcome.error.unwrap_or_else(|| "unknown channel error".to_string()));
        }
        self.deliveries.update(delivery).await.map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        if delivery.status == crate::domain::models::DeliveryStatus::Failed && !delivery.can_retry() {
            return Err(NotificationError::MaxAttemptsExceeded);
        }
        Ok(())
    }

    async fn engagement_record_sent(&self, user_id: Uuid, channel: Channel, batch_type: BatchType) {
        let mut metrics = self.engagement.get_metrics(user_id).await.ok().flatten().unwrap_or_else(|| {
            crate::domain::models::EngagementMetrics::new(user_id)
        });
        metrics.record_sent(channel, batch_type);
        let _ = self.engagement.save_metrics(&metrics).await;
    }

    /// Record an externally-reported engagement callback (opened/clicked/
    /// action-taken), advancing the delivery and recomputing rates (§4.6).
    #[instrument(skip(self), err)]
    pub async fn record_engagement(&self, delivery: &mut NotificationDelivery, kind: EngagementKind) -> Result<()> {
        let now = self.clock.now();
        let status = match kind {
            EngagementKind::Opened => crate::domain::models::DeliveryStatus::Opened,
            EngagementKind::Clicked => crate::domain::models::DeliveryStatus::Clicked,
            EngagementKind::ActionTaken => crate::domain::models::DeliveryStatus::Clicked,
        };
        let _ = delivery.advance(status);
        self.deliveries.update(delivery).await.context("persisting engagement advance")?;

        let event = EngagementEvent { id: Uuid::new_v4(), user_id: delivery.user_id, delivery_id: delivery.id, channel: delivery.channel, kind, occurred_at: now };
        self.engagement.record_event(&event).await.context("recording engagement event")?;

        let mut metrics = self.engagement.get_metrics(delivery.user_id).await.context("loading metrics")?.unwrap_or_else(|| {
            crate::domain::models::EngagementMetrics::new(delivery.user_id)
        });
        metrics.record_engagement(delivery.channel, kind, now);
        self.engagement.save_metrics(&metrics).await.context("saving metrics")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationDispatch for NotificationPipeline {
    #[instrument(skip(self, alert), err)]
    async fn dispatch(&self, alert: &Alert, channel: Channel, batch_type: BatchType) -> Result<(), NotificationError> {
        let now = self.clock.now();

        if self
            .deliveries
            .recently_delivered(alert.id, channel, now - chrono::Duration::seconds(self.config.dedup_window_secs as i64))
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?
        {
            return Ok(());
        }

        if self.throttle.check_key(&(alert.user_id, channel)).is_err() {
            return Ok(()); // throttled; drop silently, channel will catch up next cycle
        }

        match batch_type {
            BatchType::Immediate => {
                let mut delivery = NotificationDelivery::new_for_alert(alert.user_id, channel, alert.id);
                self.send_delivery(&mut delivery).await?;
                self.engagement_record_sent(alert.user_id, channel, BatchType::Immediate).await;
                Ok(())
            }
            BatchType::Hourly | BatchType::Daily => self.append_to_batch(alert, channel, batch_type, now).await,
        }
    }
}

impl NotificationPipeline {
    async fn append_to_batch(&self, alert: &Alert, channel: Channel, batch_type: BatchType, now: DateTime<Utc>) -> Result<(), NotificationError> {
        let existing = self
            .batches
            .open_batch(alert.user_id, channel, batch_type, now)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let mut batch = match existing {
            Some(b) => b,
            None => {
                let scheduled_for = match batch_type {
                    BatchType::Hourly => next_hour_boundary(now),
                    BatchType::Daily => next_daily_boundary(now, self.config.default_daily_summary_hour),
                    BatchType::Immediate => unreachable!("immediate handled by caller"),
                };
                NotificationBatch::open(alert.user_id, channel, batch_type, scheduled_for)
            }
        };

        let is_new = batch.alert_ids.is_empty();
        batch.push(alert.id);
        let result = if is_new { self.batches.insert(&batch).await } else { self.batches.update(&batch).await };
        result.map_err(|e| NotificationError::SendFailed(e.to_string()))
    }
}

fn batch_type_or(batch: &NotificationBatch) -> BatchType {
    batch.batch_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_key_is_user_and_channel() {
        let per_hour = NonZeroU32::new(2).unwrap();
        let limiter: Throttle = RateLimiter::keyed(Quota::per_hour(per_hour));
        let user = Uuid::new_v4();
        assert!(limiter.check_key(&(user, Channel::Email)).is_ok());
        assert!(limiter.check_key(&(user, Channel::Email)).is_ok());
        assert!(limiter.check_key(&(user, Channel::Email)).is_err());
        // A different channel for the same user has an independent bucket.
        assert!(limiter.check_key(&(user, Channel::Push)).is_ok());
    }
}
