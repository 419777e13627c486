//! Queue Dispatcher & Worker Pool (C4, §4.3): lane allocation, retailer
//! throttling, even-spread admission, and the per-task worker execution step.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::error::DispatchError;
use crate::domain::models::{DispatcherConfig, Lane, Task};
use crate::domain::ports::{Clock, Extractor, ExtractorRegistry, ProductRepository, TaskRepository};
use crate::services::product_locks::ProductLocks;
use crate::services::result_analyzer::ResultAnalyzer;
use crate::services::retailer_throttle::RetailerThrottle;

/// Selects a batch of pending tasks honoring the 40/40/20 lane ratio and the
/// 4:2:1 interleaving rhythm (§4.3).
pub fn allocate_and_interleave(high: Vec<Task>, normal: Vec<Task>, low: Vec<Task>, max_tasks: u32) -> Vec<Task> {
    let high_quota = (max_tasks as f64 * 0.4).floor() as usize;
    let normal_quota = (max_tasks as f64 * 0.4).floor() as usize;
    let low_quota = max_tasks as usize - high_quota - normal_quota;

    let mut h: VecDeque<Task> = high.into_iter().take(high_quota).collect();
    let mut n: VecDeque<Task> = normal.into_iter().take(normal_quota).collect();
    let mut l: VecDeque<Task> = low.into_iter().take(low_quota).collect();

    let mut out = Vec::with_capacity(h.len() + n.len() + l.len());
    while !h.is_empty() || !n.is_empty() || !l.is_empty() {
        for _ in 0..4 {
            if let Some(t) = h.pop_front() {
                out.push(t);
            }
        }
        for _ in 0..2 {
            if let Some(t) = n.pop_front() {
                out.push(t);
            }
        }
        if let Some(t) = l.pop_front() {
            out.push(t);
        }
    }
    out
}

/// Round-robins candidate tasks by retailer, taking the highest-priority
/// pending task from each retailer in turn, so one backlogged retailer
/// cannot starve the others (§4.3 even-spread policy).
pub fn even_spread(mut by_retailer: Vec<(String, VecDeque<Task>)>, budget: usize) -> Vec<Task> {
    let mut out = Vec::with_capacity(budget);
    'outer: loop {
        let mut made_progress = false;
        for (_, queue) in by_retailer.iter_mut() {
            if out.len() >= budget {
                break 'outer;
            }
            if let Some(task) = queue.pop_front() {
                out.push(task);
                made_progress = true;
            }
        }
        if !made_progress {
            break;
        }
    }
    out
}

pub struct Dispatcher {
    tasks: Arc<dyn TaskRepository>,
    products: Arc<dyn ProductRepository>,
    extractors: Arc<dyn ExtractorRegistry>,
    analyzer: Arc<ResultAnalyzer>,
    throttle: Arc<RetailerThrottle>,
    locks: Arc<ProductLocks>,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        products: Arc<dyn ProductRepository>,
        extractors: Arc<dyn ExtractorRegistry>,
        analyzer: Arc<ResultAnalyzer>,
        throttle: Arc<RetailerThrottle>,
        locks: Arc<ProductLocks>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self { tasks, products, extractors, analyzer, throttle, locks, clock, config }
    }

    /// One dispatch cycle: pull, lane-allocate, interleave, admit under the
    /// retailer throttle, and run each admitted task to completion.
    #[instrument(skip(self), err)]
    pub async fn run_cycle(&self) -> Result<u32> {
        let pending = self.tasks.pending_ordered(self.config.max_tasks_per_cycle).await.context("loading pending tasks")?;
        let (high, normal, low) = partition_by_lane(pending);

        let batch = allocate_and_interleave(high, normal, low, self.config.max_tasks_per_cycle);
        let mut admitted = 0u32;

        for task in batch {
            let Some(product) = self.products.get(task.product_id).await.context("loading product for task")? else {
                warn!(task_id = %task.id, "task references missing product, skipping");
                continue;
            };
            let Some(host) = product.host() else {
                warn!(task_id = %task.id, "product url has no host, skipping");
                continue;
            };

            if !self.throttle.admit(&product.retailer).await {
                continue; // rejected task remains pending (§4.3)
            }
            if !self.locks.try_acquire(product.id).await {
                self.throttle.release(&product.retailer).await;
                continue;
            }

            let outcome = self.execute(task, host).await;
            self.locks.release(product.id).await;
            self.throttle.release(&product.retailer).await;

            if let Err(err) = outcome {
                warn!(error = %err, "worker execution step failed");
            } else {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Worker execution step (§4.3): claim, extract under timeout, hand off
    /// to the Result Analyzer, and resolve the task's terminal/retry state.
    #[instrument(skip(self, task), fields(task_id = %task.id), err)]
    async fn execute(&self, mut task: Task, host: &str) -> Result<()> {
        let started = self.clock.now();
        task.admit().context("admitting task")?;
        task.claim(started).context("claiming task")?;
        self.tasks.update(&task).await.context("persisting claimed task")?;

        let extractor = self.resolve_extractor(host, &mut task, started).await?;
        let Some(extractor) = extractor else { return Ok(()) };

        let product = self.products.get(task.product_id).await.context("reloading product")?;
        let Some(product) = product else { return Ok(()) };

        let result = tokio::time::timeout(
            StdDuration::from_secs(self.config.extractor_timeout_secs),
            extractor.extract(&product.url),
        )
        .await;

        let now = self.clock.now();
        if (now - started).num_seconds() as u64 >= self.config.hard_deadline_secs {
            task.fail_terminal(now, DispatchError::HardDeadlineExceeded.to_string())?;
            self.tasks.update(&task).await.context("persisting hard-deadline failure")?;
            return Ok(());
        }

        match result {
            Err(_elapsed) => self.finish_with_error(&mut task, now, DispatchError::ExtractorTimeout(self.config.extractor_timeout_secs)).await,
            Ok(Err(err)) => self.finish_with_error(&mut task, now, err).await,
            Ok(Ok(payload)) => {
                let observation =
                    self.analyzer.analyze(product.id, task.id, payload, now).await.context("analyzing observation")?;
                task.complete(now, observation.id)?;
                self.tasks.update(&task).await.context("persisting completed task")?;
                Ok(())
            }
        }
    }

    async fn resolve_extractor(
        &self,
        host: &str,
        task: &mut Task,
        now: DateTime<Utc>,
    ) -> Result<Option<Arc<dyn Extractor>>> {
        match self.extractors.resolve(host) {
            Some(extractor) => Ok(Some(extractor)),
            None => {
                task.fail_terminal(now, DispatchError::NoExtractorForRetailer(host.to_string()).to_string())?;
                self.tasks.update(task).await.context("persisting no-extractor failure")?;
                Ok(None)
            }
        }
    }

    async fn finish_with_error(&self, task: &mut Task, now: DateTime<Utc>, err: DispatchError) -> Result<()> {
        if err.is_permanent() {
            task.fail_terminal(now, err.to_string())?;
        } else {
            task.fail(now, err.to_string())?;
        }
        self.tasks.update(task).await.context("persisting failed task")?;
        Ok(())
    }
}

fn partition_by_lane(tasks: Vec<Task>) -> (Vec<Task>, Vec<Task>, Vec<Task>) {
    let mut high = Vec::new();
    let mut normal = Vec::new();
    let mut low = Vec::new();
    for task in tasks {
        match task.lane() {
            Lane::High => high.push(task),
            Lane::Normal => normal.push(task),
            Lane::Low => low.push(task),
        }
    }
    (high, normal, low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(priority: u8) -> Task {
        Task::new(Uuid::new_v4(), priority, Utc::now()).unwrap()
    }

    #[test]
    fn interleaves_in_4_2_1_rhythm() {
        let high = vec![task(1), task(1), task(1), task(1), task(1)];
        let normal = vec![task(5), task(5), task(5)];
        let low = vec![task(9), task(9)];
        let batch = allocate_and_interleave(high, normal, low, 10);
        let lanes: Vec<Lane> = batch.iter().map(Task::lane).collect();
        assert_eq!(&lanes[0..7], &[Lane::High, Lane::High, Lane::High, Lane::High, Lane::Normal, Lane::Normal, Lane::Low]);
    }

    #[test]
    fn lane_quotas_respect_40_40_20_split() {
        let high: Vec<Task> = (0..20).map(|_| task(1)).collect();
        let normal: Vec<Task> = (0..20).map(|_| task(5)).collect();
        let low: Vec<Task> = (0..20).map(|_| task(9)).collect();
        let batch = allocate_and_interleave(high, normal, low, 10);
        let high_count = batch.iter().filter(|t| t.lane() == Lane::High).count();
        let normal_count = batch.iter().filter(|t| t.lane() == Lane::Normal).count();
        let low_count = batch.iter().filter(|t| t.lane() == Lane::Low).count();
        assert_eq!(high_count, 4);
        assert_eq!(normal_count, 4);
        assert_eq!(low_count, 2);
    }

    #[test]
    fn even_spread_round_robins_across_retailers() {
        let amazon: VecDeque<Task> = vec![task(1), task(2), task(3)].into();
        let fnac: VecDeque<Task> = vec![task(4)].into();
        let queues = vec![("amazon".to_string(), amazon), ("fnac".to_string(), fnac)];
        let out = even_spread(queues, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].priority, 1);
        assert_eq!(out[1].priority, 4);
        assert_eq!(out[2].priority, 2);
    }
}
