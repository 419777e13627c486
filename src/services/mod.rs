//! Application services for the price-monitoring core.

pub mod alert_rule_engine;
pub mod dispatcher;
pub mod event_bus;
pub mod notification_pipeline;
pub mod priority_scorer;
pub mod product_locks;
pub mod result_analyzer;
pub mod retailer_throttle;
pub mod scheduler;
pub mod stats_service;

pub use alert_rule_engine::AlertRuleEngine;
pub use dispatcher::{allocate_and_interleave, even_spread, Dispatcher};
pub use event_bus::{EventBus, SharedEventBus};
pub use notification_pipeline::NotificationPipeline;
pub use priority_scorer::DefaultPriorityScorer;
pub use product_locks::{ProductLocks, SharedProductLocks};
pub use result_analyzer::ResultAnalyzer;
pub use retailer_throttle::{RetailerThrottle, SharedRetailerThrottle};
pub use scheduler::Scheduler;
pub use stats_service::StatsService;
