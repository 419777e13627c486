//! Implementation of `pricemon serve`: drives the Scheduler, Dispatcher, and
//! Notification Pipeline on their configured cadences until interrupted,
//! and bridges Result Analyzer events to the Alert Rule Engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::cli::AppContext;
use crate::domain::models::Event;
use crate::services::AlertRuleEngine;

pub async fn handle_serve(ctx: &AppContext, events: broadcast::Receiver<Event>) -> Result<()> {
    info!("serve starting");

    let mut shutdown = tokio::signal::ctrl_c();

    let schedule_period = Duration::from_secs(ctx.config.scheduler.run_interval_secs);
    let dispatch_period = Duration::from_secs(ctx.config.dispatcher.run_interval_secs);
    let sweep_period = Duration::from_secs(ctx.config.notifications.sweep_interval_secs);

    let mut schedule_tick = tokio::time::interval(schedule_period);
    let mut dispatch_tick = tokio::time::interval(dispatch_period);
    let mut sweep_tick = tokio::time::interval(sweep_period);

    let event_task = tokio::spawn(drive_alert_rule_engine(ctx.alert_rules_engine.clone(), events));

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("serve received shutdown signal");
                break;
            }
            _ = schedule_tick.tick() => {
                match ctx.scheduler.schedule_due_products(ctx.config.scheduler.batch_size).await {
                    Ok(n) => info!(scheduled = n, "schedule cycle complete"),
                    Err(err) => error!(error = %err, "schedule cycle failed"),
                }
            }
            _ = dispatch_tick.tick() => {
                match ctx.dispatcher.run_cycle().await {
                    Ok(n) => info!(admitted = n, "dispatch cycle complete"),
                    Err(err) => error!(error = %err, "dispatch cycle failed"),
                }
            }
            _ = sweep_tick.tick() => {
                match ctx.notifications.run_sweep().await {
                    Ok(n) => info!(dispatched = n, "notification sweep complete"),
                    Err(err) => error!(error = %err, "notification sweep failed"),
                }
            }
        }
    }

    event_task.abort();
    Ok(())
}

async fn drive_alert_rule_engine(engine: Arc<AlertRuleEngine>, mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(err) = engine.handle_event(&event).await {
                    error!(error = %err, "alert rule evaluation failed");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "alert rule engine lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
