//! pricemon - price-monitoring scheduler, dispatcher, and notification platform.
//!
//! - Priority Scorer: multi-factor per-product check priority
//! - Scheduler: admits due tasks into the dispatch queue
//! - Queue Dispatcher & Worker Pool: lane allocation, retailer throttling, extraction
//! - Result Analyzer: turns observations into alerts
//! - Alert Rule Engine: evaluates per-user trigger rules against events
//! - Notification Pipeline: batches, dedupes, and delivers notifications

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
