//! Implementation of `pricemon product add-config|force-immediate|set-boost`.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cli::output::{output, CommandOutput};
use crate::cli::AppContext;
use crate::domain::models::{MonitoringConfig, Product};

#[derive(Debug, serde::Serialize)]
pub struct ProductOutput {
    pub message: String,
    pub product_id: Uuid,
}

impl CommandOutput for ProductOutput {
    fn to_human(&self) -> String {
        format!("{} ({})", self.message, self.product_id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn handle_add_config(ctx: &AppContext, url: String, retailer: String, currency: String, json_mode: bool) -> Result<()> {
    let product = Product::new(url, retailer, currency);
    ctx.products.insert(&product).await.context("inserting product")?;

    let config = MonitoringConfig::new(product.id);
    ctx.monitoring_configs.insert(&config).await.context("inserting monitoring config")?;

    output(&ProductOutput { message: "Product registered".to_string(), product_id: product.id }, json_mode);
    Ok(())
}

pub async fn handle_force_immediate(ctx: &AppContext, product_id: Uuid, json_mode: bool) -> Result<()> {
    let mut config = ctx
        .monitoring_configs
        .get_by_product(product_id)
        .await
        .context("loading monitoring config")?
        .ok_or_else(|| anyhow!("no monitoring config for product {product_id}"))?;

    config.next_scheduled = Some(Utc::now());
    ctx.monitoring_configs.update_schedule(&config).await.context("advancing schedule")?;

    output(&ProductOutput { message: "Scheduled immediately".to_string(), product_id }, json_mode);
    Ok(())
}

pub async fn handle_set_boost(ctx: &AppContext, product_id: Uuid, boost: String, json_mode: bool) -> Result<()> {
    let boost: Decimal = boost.parse().context("boost must be a decimal")?;
    if boost < Decimal::ZERO || boost > Decimal::from(10) {
        return Err(anyhow!("boost must be within [0, 10]"));
    }

    let mut config = ctx
        .monitoring_configs
        .get_by_product(product_id)
        .await
        .context("loading monitoring config")?
        .ok_or_else(|| anyhow!("no monitoring config for product {product_id}"))?;

    config.manual_priority_boost = boost;
    ctx.monitoring_configs.update_schedule(&config).await.context("persisting boost")?;

    output(&ProductOutput { message: "Boost updated".to_string(), product_id }, json_mode);
    Ok(())
}
