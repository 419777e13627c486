//! Implementation of `pricemon stats`.

use anyhow::Result;
use chrono::Utc;

use crate::cli::output::{heading, output, CommandOutput};
use crate::cli::AppContext;
use crate::domain::models::MonitoringStats;

impl CommandOutput for MonitoringStats {
    fn to_human(&self) -> String {
        let mut lines = vec![
            heading(&format!("Monitoring stats as of {}", self.computed_at.to_rfc3339())),
            format!("  Products tracked:        {}", self.products_tracked),
            format!("  Active configs:          {}", self.active_configs),
            format!("  Average priority score:  {:.2}", self.average_priority_score),
            format!("  Alerts fired (24h):      {}", self.alerts_fired_last_window),
            "  Tasks by status:".to_string(),
        ];
        let mut statuses: Vec<_> = self.tasks_by_status.iter().collect();
        statuses.sort_by_key(|(status, _)| format!("{status:?}"));
        for (status, count) in statuses {
            lines.push(format!("    {status:?}: {count}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn handle_stats(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let stats = ctx.stats.compute(Utc::now()).await?;
    output(&stats, json_mode);
    Ok(())
}
