// northstar/src/commands/mod.rs

pub mod decompose;
pub mod metrics;
pub mod quality;
pub mod run;
pub mod segments;

use anyhow::{Context, bail};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tracing::debug;

use northstar_core::domain::config::AnalysisConfig;
use northstar_core::infrastructure::adapters::DuckDbSource;
use northstar_core::infrastructure::config::{load_analysis_config, parse_profile};

use crate::cli::{ConfigArgs, InputArgs};

/// Loads `northstar.yaml` (or the explicit file) with the selected profile applied.
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<AnalysisConfig> {
    let profile = parse_profile(&args.profile)?;
    let config = load_analysis_config(&args.project_dir, args.config.as_deref(), profile)
        .with_context(|| {
            format!(
                "Failed to load analysis configuration from {:?}",
                args.project_dir
            )
        })?;
    debug!(?profile, ?config, "Analysis configuration loaded");
    Ok(config)
}

/// Opens the DuckDB-backed source for either input mode.
pub fn open_source(input: &InputArgs, config: &AnalysisConfig) -> anyhow::Result<DuckDbSource> {
    let source = match (&input.input, &input.orders, &input.order_products) {
        (Some(path), _, _) => DuckDbSource::from_aggregates(path)
            .with_context(|| format!("Failed to open aggregate table {:?}", path))?,
        (None, Some(orders), Some(order_products)) => {
            DuckDbSource::from_raw(orders, order_products, config.small_basket_threshold)
                .with_context(|| {
                    format!(
                        "Failed to open raw inputs {:?} and {:?}",
                        orders, order_products
                    )
                })?
        }
        _ => bail!("Provide --input <aggregates.csv>, or both --orders and --order-products"),
    };
    Ok(source)
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}
