use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pricemon::domain::models::{MonitoringConfig, PriorityWeights, Product};
use pricemon::domain::ports::priority_scorer::ScoringContext;
use pricemon::domain::ports::PriorityScorer;
use pricemon::services::DefaultPriorityScorer;
use uuid::Uuid;

fn bench_priority_calculation(c: &mut Criterion) {
    let scorer = DefaultPriorityScorer::new(PriorityWeights::default());
    let mut product = Product::new("https://www.amazon.fr/dp/X", "amazon", "EUR");
    product.current_price = "199.99".parse().unwrap();
    product.last_checked_at = Some(Utc::now());
    let config = MonitoringConfig::new(Uuid::new_v4());
    let context = ScoringContext {
        observation_count_30d: 30,
        price_change_count_30d: 6,
        price_min_30d: Some("150.00".parse().unwrap()),
        price_max_30d: Some("220.00".parse().unwrap()),
        active_alert_rule_count: 3,
        view_count: 80,
    };
    let now = Utc::now();

    c.bench_function("priority_calculation", |b| {
        b.iter(|| scorer.score(black_box(&product), black_box(&config), black_box(&context), black_box(now)))
    });
}

criterion_group!(benches, bench_priority_calculation);
criterion_main!(benches);
