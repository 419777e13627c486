//! Command-line presentation layer: argument parsing, human/JSON rendering,
//! and the handlers that wire a parsed [`Commands`] to the application
//! services built in `main`.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, DispatchCommands, ProductCommands, RuleCommands, ScheduleCommands};

use std::sync::Arc;

use crate::domain::models::Config;
use crate::domain::ports::{AlertRepository, AlertRuleRepository, MonitoringConfigRepository, ProductRepository};
use crate::services::{AlertRuleEngine, Dispatcher, NotificationPipeline, Scheduler, StatsService};

/// Everything a command handler needs, assembled once in `main` and passed
/// down by reference. Mirrors the teacher's pattern of handing each command
/// handler the one or two services it needs rather than a god object, but
/// since several `serve` subsystems share the same repositories, this binds
/// them once at startup instead of re-threading the same six `Arc`s through
/// every call site.
pub struct AppContext {
    pub config: Config,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<Dispatcher>,
    pub notifications: Arc<NotificationPipeline>,
    pub alert_rules_engine: Arc<AlertRuleEngine>,
    pub stats: Arc<StatsService>,
    pub products: Arc<dyn ProductRepository>,
    pub monitoring_configs: Arc<dyn MonitoringConfigRepository>,
    pub alert_rules: Arc<dyn AlertRuleRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}
