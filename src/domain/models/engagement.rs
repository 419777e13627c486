//! Engagement tracking: raw events plus the rates derived from them (§4.6).

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::notification_batch::BatchType;
use super::notification_delivery::Channel;

/// An external callback (opened/clicked/action-taken) received at the
/// control-plane boundary. Append-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Opened,
    Clicked,
    ActionTaken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_id: Uuid,
    pub channel: Channel,
    pub kind: EngagementKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelRates {
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub actioned: u64,
}

impl ChannelRates {
    pub fn open_rate(&self) -> f64 {
        if self.sent == 0 { 0.0 } else { self.opened as f64 / self.sent as f64 }
    }

    pub fn click_rate(&self) -> f64 {
        if self.sent == 0 { 0.0 } else { self.clicked as f64 / self.sent as f64 }
    }
}

/// One per user: derived open/click/action rates, optimal channel ordering,
/// and optimal send timing (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngagementMetrics {
    pub user_id: Uuid,
    pub per_channel: HashMap<Channel, ChannelRates>,
    pub per_batch_type: HashMap<BatchType, ChannelRates>,
    weekday_counts: [u64; 7],
    hour_counts: [u64; 24],
}

impl EngagementMetrics {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, ..Default::default() }
    }

    pub fn record_sent(&mut self, channel: Channel, batch_type: BatchType) {
        self.per_channel.entry(channel).or_default().sent += 1;
        self.per_batch_type.entry(batch_type).or_default().sent += 1;
    }

    pub fn record_engagement(&mut self, channel: Channel, kind: EngagementKind, at: DateTime<Utc>) {
        let rates = self.per_channel.entry(channel).or_default();
        match kind {
            EngagementKind::Opened => rates.opened += 1,
            EngagementKind::Clicked => rates.clicked += 1,
            EngagementKind::ActionTaken => rates.actioned += 1,
        }
        self.weekday_counts[at.weekday().num_days_from_monday() as usize] += 1;
        self.hour_counts[at.hour() as usize] += 1;
    }

    /// Channels ranked by open rate descending, highest first.
    pub fn optimal_channel_order(&self) -> Vec<Channel> {
        let mut channels: Vec<_> = self.per_channel.iter().collect();
        channels.sort_by(|a, b| b.1.open_rate().partial_cmp(&a.1.open_rate()).unwrap());
        channels.into_iter().map(|(c, _)| *c).collect()
    }

    /// The weekday (0 = Monday) with the most recorded engagement.
    pub fn modal_weekday(&self) -> Option<u32> {
        arg_max(&self.weekday_counts)
    }

    /// The hour-of-day (0-23 UTC) with the most recorded engagement.
    pub fn modal_hour(&self) -> Option<u32> {
        arg_max(&self.hour_counts)
    }

    /// The batch type with the highest aggregate open rate.
    pub fn best_batch_type(&self) -> Option<BatchType> {
        self.per_batch_type
            .iter()
            .max_by(|a, b| a.1.open_rate().partial_cmp(&b.1.open_rate()).unwrap())
            .map(|(bt, _)| *bt)
    }
}

fn arg_max(counts: &[u64]) -> Option<u32> {
    if counts.iter().all(|c| *c == 0) {
        return None;
    }
    counts
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| **c)
        .map(|(i, _)| i as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimal_channel_order_ranks_by_open_rate() {
        let mut m = EngagementMetrics::new(Uuid::new_v4());
        m.record_sent(Channel::Email, BatchType::Hourly);
        m.record_sent(Channel::Push, BatchType::Hourly);
        m.record_engagement(Channel::Push, EngagementKind::Opened, Utc::now());
        let order = m.optimal_channel_order();
        assert_eq!(order.first(), Some(&Channel::Push));
    }

    #[test]
    fn no_engagement_means_no_modal_hour() {
        let m = EngagementMetrics::new(Uuid::new_v4());
        assert_eq!(m.modal_hour(), None);
    }
}
