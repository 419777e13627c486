//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod alert;
pub mod alert_rule;
pub mod config;
pub mod engagement;
pub mod event;
pub mod monitoring_config;
pub mod monitoring_stats;
pub mod notification_batch;
pub mod notification_delivery;
pub mod observation;
pub mod product;
pub mod task;

pub use alert::{Alert, PriceDeltaSnapshot};
pub use alert_rule::{AlertRule, ChannelMap, Condition, Operator};
pub use config::{
    Config, DatabaseConfig, DispatcherConfig, LogFormat, LoggingConfig, NotificationConfig,
    PriorityWeights, RetentionConfig, RotationPolicy, SchedulerConfig,
};
pub use engagement::{ChannelRates, EngagementEvent, EngagementKind, EngagementMetrics};
pub use event::{Event, EventType, FieldValue};
pub use monitoring_config::{MonitoringConfig, MonitoringFrequency};
pub use monitoring_stats::MonitoringStats;
pub use notification_batch::{BatchStatus, BatchType, NotificationBatch};
pub use notification_delivery::{Channel, DeliveryError, DeliveryStatus, NotificationDelivery};
pub use observation::{AlertTrigger, ObservationPayload, ObservationResult};
pub use product::Product;
pub use task::{Lane, Task, TaskError, TaskStatus};
