//! Implementation of `pricemon schedule run-once`.

use anyhow::Result;

use crate::cli::output::{output, CommandOutput};
use crate::cli::AppContext;

#[derive(Debug, serde::Serialize)]
pub struct ScheduleOutput {
    pub scheduled: u32,
}

impl CommandOutput for ScheduleOutput {
    fn to_human(&self) -> String {
        format!("Scheduled {} task(s).", self.scheduled)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn handle_run_once(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let scheduled = ctx.scheduler.schedule_due_products(ctx.config.scheduler.batch_size).await?;
    output(&ScheduleOutput { scheduled }, json_mode);
    Ok(())
}
