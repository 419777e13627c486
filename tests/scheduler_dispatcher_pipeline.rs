//! End-to-end pipeline test: register a product, schedule it, dispatch it
//! (with no extractors registered, so the cycle admits nothing), and confirm
//! the monitoring config round-trips through SQLite correctly.

use std::sync::Arc;

use chrono::Utc;
use pricemon::adapters::registry::HostExtractorRegistry;
use pricemon::adapters::sqlite::{
    create_migrated_test_pool, SqliteAlertRepository, SqliteAlertRuleRepository, SqliteMonitoringConfigRepository,
    SqliteObservationRepository, SqliteProductRepository, SqliteTaskRepository,
};
use pricemon::domain::models::{Config, MonitoringConfig, Product};
use pricemon::domain::ports::{
    AlertRuleRepository, Clock, MonitoringConfigRepository, ProductRepository, SystemClock, TaskRepository,
};
use pricemon::services::{DefaultPriorityScorer, Dispatcher, ProductLocks, ResultAnalyzer, RetailerThrottle, Scheduler, StatsService};

#[tokio::test]
async fn schedule_then_dispatch_round_trips_through_sqlite() {
    let pool = create_migrated_test_pool().await.expect("migrated pool");

    let products: Arc<dyn ProductRepository> = Arc::new(SqliteProductRepository::new(pool.clone()));
    let configs: Arc<dyn MonitoringConfigRepository> = Arc::new(SqliteMonitoringConfigRepository::new(pool.clone()));
    let tasks: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let observations = Arc::new(SqliteObservationRepository::new(pool.clone()));
    let alert_rules: Arc<dyn AlertRuleRepository> = Arc::new(SqliteAlertRuleRepository::new(pool.clone()));
    let alerts = Arc::new(SqliteAlertRepository::new(pool.clone()));

    let product = Product::new("https://www.amazon.fr/dp/ABC123", "amazon", "EUR");
    products.insert(&product).await.unwrap();

    let mut config = MonitoringConfig::new(product.id);
    config.next_scheduled = Some(Utc::now());
    configs.insert(&config).await.unwrap();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scorer = Arc::new(DefaultPriorityScorer::new(Default::default()));

    let scheduler = Scheduler::new(
        configs.clone(),
        products.clone(),
        tasks.clone(),
        observations.clone(),
        alert_rules.clone(),
        scorer,
        clock.clone(),
    );

    let scheduled = scheduler.schedule_due_products(10).await.unwrap();
    assert_eq!(scheduled, 1);

    let dispatcher_config = Config::default().dispatcher;
    let extractors = Arc::new(HostExtractorRegistry::new());
    let analyzer = Arc::new(ResultAnalyzer::new(products.clone(), configs.clone(), observations, Arc::new(Default::default())));
    let throttle = Arc::new(RetailerThrottle::new(&dispatcher_config));
    let locks = Arc::new(ProductLocks::new());

    let dispatcher = Dispatcher::new(tasks.clone(), products.clone(), extractors, analyzer, throttle, locks, clock, dispatcher_config);

    // No extractor is registered for amazon.fr, so the task stays pending.
    let admitted = dispatcher.run_cycle().await.unwrap();
    assert_eq!(admitted, 0);

    let stats = StatsService::new(products, configs, tasks, alerts);
    let snapshot = stats.compute(Utc::now()).await.unwrap();
    assert_eq!(snapshot.products_tracked, 1);
    assert_eq!(snapshot.active_configs, 1);
}
