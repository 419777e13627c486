//! Implementation of the `pricemon init` command.

use anyhow::{Context, Result};
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.database_initialized {
            lines.push("\nDatabase initialized at .price-monitor/price-monitor.db".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(force: bool, json_mode: bool) -> Result<()> {
    let dir = std::path::Path::new(".price-monitor");

    if dir.exists() && !force {
        output(
            &InitOutput {
                success: false,
                message: "Already initialized. Use --force to reinitialize.".to_string(),
                database_initialized: false,
            },
            json_mode,
        );
        return Ok(());
    }

    if force && dir.exists() {
        fs::remove_dir_all(dir).await.context("failed to remove existing .price-monitor directory")?;
    }

    fs::create_dir_all(dir).await.context("failed to create .price-monitor directory")?;

    initialize_database("sqlite:.price-monitor/price-monitor.db").await.context("failed to initialize database")?;

    output(
        &InitOutput {
            success: true,
            message: if force {
                "Reinitialized successfully.".to_string()
            } else {
                "Initialized successfully.".to_string()
            },
            database_initialized: true,
        },
        json_mode,
    );
    Ok(())
}
