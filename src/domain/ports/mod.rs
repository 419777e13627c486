//! Domain ports (interfaces) for the price-monitoring core.

pub mod alert_repository;
pub mod channel_adapter;
pub mod clock;
pub mod extractor;
pub mod notification_dispatch;
pub mod notification_repository;
pub mod observation_repository;
pub mod priority_scorer;
pub mod product_repository;
pub mod task_repository;

pub use alert_repository::{AlertRepository, AlertRuleRepository};
pub use channel_adapter::{ChannelAdapter, ChannelRegistry, SendOutcome};
pub use clock::{Clock, SystemClock};
pub use extractor::{Extractor, ExtractorRegistry};
pub use notification_dispatch::NotificationDispatch;
pub use notification_repository::{EngagementRepository, NotificationBatchRepository, NotificationDeliveryRepository};
pub use observation_repository::ObservationRepository;
pub use priority_scorer::{PriorityScorer, ScoringContext};
pub use product_repository::{MonitoringConfigRepository, ProductRepository};
pub use task_repository::TaskRepository;
