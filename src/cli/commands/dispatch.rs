//! Implementation of `pricemon dispatch run-once`.

use anyhow::Result;

use crate::cli::output::{output, CommandOutput};
use crate::cli::AppContext;

#[derive(Debug, serde::Serialize)]
pub struct DispatchOutput {
    pub admitted: u32,
}

impl CommandOutput for DispatchOutput {
    fn to_human(&self) -> String {
        format!("Admitted {} task(s) for execution.", self.admitted)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn handle_run_once(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let admitted = ctx.dispatcher.run_cycle().await?;
    output(&DispatchOutput { admitted }, json_mode);
    Ok(())
}
