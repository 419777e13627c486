//! pricemon CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use pricemon::adapters::registry::{HostExtractorRegistry, StaticChannelRegistry};
use pricemon::adapters::sqlite::{
    initialize_database, SqliteAlertRepository, SqliteAlertRuleRepository, SqliteEngagementRepository,
    SqliteMonitoringConfigRepository, SqliteNotificationBatchRepository, SqliteNotificationDeliveryRepository,
    SqliteObservationRepository, SqliteProductRepository, SqliteTaskRepository,
};
use pricemon::cli::commands::{dispatch, init, product, rule, schedule, serve, stats};
use pricemon::cli::{AppContext, Cli, Commands, DispatchCommands, ProductCommands, RuleCommands, ScheduleCommands};
use pricemon::domain::ports::{Clock, SystemClock};
use pricemon::infrastructure::config::ConfigLoader;
use pricemon::infrastructure::logging::{LogConfig, LoggerImpl};
use pricemon::services::{
    AlertRuleEngine, DefaultPriorityScorer, Dispatcher, EventBus, NotificationPipeline, ProductLocks,
    RetailerThrottle, Scheduler, StatsService,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return init::execute(force, cli.json).await;
    }

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging)).context("failed to initialize logging")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url).await.context("failed to initialize database")?;

    let products = Arc::new(SqliteProductRepository::new(pool.clone()));
    let monitoring_configs = Arc::new(SqliteMonitoringConfigRepository::new(pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let observations = Arc::new(SqliteObservationRepository::new(pool.clone()));
    let alerts = Arc::new(SqliteAlertRepository::new(pool.clone()));
    let alert_rules = Arc::new(SqliteAlertRuleRepository::new(pool.clone()));
    let notification_batches = Arc::new(SqliteNotificationBatchRepository::new(pool.clone()));
    let notification_deliveries = Arc::new(SqliteNotificationDeliveryRepository::new(pool.clone()));
    let engagement = Arc::new(SqliteEngagementRepository::new(pool.clone()));

    // Extension points: extractors and channel adapters register here as
    // they are implemented; an empty registry means `serve`'s dispatch
    // cycle admits no tasks and the notification sweep delivers nothing.
    let extractors = Arc::new(HostExtractorRegistry::new());
    let channels = Arc::new(StaticChannelRegistry::new());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scorer = Arc::new(DefaultPriorityScorer::new(config.priority_weights.clone()));
    let event_bus = Arc::new(EventBus::default());
    let locks = Arc::new(ProductLocks::new());
    let throttle = Arc::new(RetailerThrottle::new(&config.dispatcher));

    let analyzer = Arc::new(pricemon::services::ResultAnalyzer::new(
        products.clone(),
        monitoring_configs.clone(),
        observations.clone(),
        event_bus.clone(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        monitoring_configs.clone(),
        products.clone(),
        tasks.clone(),
        observations.clone(),
        alert_rules.clone(),
        scorer.clone(),
        clock.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        tasks.clone(),
        products.clone(),
        extractors.clone(),
        analyzer,
        throttle,
        locks,
        clock.clone(),
        config.dispatcher.clone(),
    ));

    let notifications = Arc::new(NotificationPipeline::new(
        notification_deliveries,
        notification_batches,
        engagement,
        channels,
        clock.clone(),
        config.notifications.clone(),
    ));

    let alert_rules_engine = Arc::new(AlertRuleEngine::new(alert_rules.clone(), alerts.clone(), notifications.clone()));

    let stats = Arc::new(StatsService::new(products.clone(), monitoring_configs.clone(), tasks.clone(), alerts.clone()));

    let ctx = AppContext {
        config,
        scheduler,
        dispatcher,
        notifications,
        alert_rules_engine,
        stats,
        products,
        monitoring_configs,
        alert_rules,
        alerts,
    };

    match cli.command {
        Commands::Init { .. } => unreachable!("init is handled before service construction"),

        Commands::Schedule(ScheduleCommands::RunOnce) => schedule::handle_run_once(&ctx, cli.json).await,

        Commands::Dispatch(DispatchCommands::RunOnce) => dispatch::handle_run_once(&ctx, cli.json).await,

        Commands::Serve => serve::handle_serve(&ctx, event_bus.subscribe()).await,

        Commands::Product(cmd) => match cmd {
            ProductCommands::AddConfig { url, retailer, currency } => {
                product::handle_add_config(&ctx, url, retailer, currency, cli.json).await
            }
            ProductCommands::ForceImmediate { product_id } => product::handle_force_immediate(&ctx, product_id, cli.json).await,
            ProductCommands::SetBoost { product_id, boost } => product::handle_set_boost(&ctx, product_id, boost, cli.json).await,
        },

        Commands::Rule(cmd) => match cmd {
            RuleCommands::Add { user_id, product_id, event, field, op, value, bool_value, text, priority, batch } => {
                rule::handle_add(&ctx, user_id, product_id, event, field, op, value, bool_value, text, priority, batch, cli.json).await
            }
            RuleCommands::List { user_id } => rule::handle_list(&ctx, user_id, cli.json).await,
        },

        Commands::Stats => stats::handle_stats(&ctx, cli.json).await,
    }
}
