// northstar/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "northstar")]
#[command(about = "North Star KPI engine: metrics, VPAC decomposition and data quality gates", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the per-user aggregate table comes from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Per-user aggregate CSV
    #[arg(long, conflicts_with_all = ["orders", "order_products"])]
    pub input: Option<PathBuf>,

    /// Raw orders CSV, aggregated per user with DuckDB
    #[arg(long, requires = "order_products")]
    pub orders: Option<PathBuf>,

    /// Raw order line items CSV (order_id, product_id, reordered)
    #[arg(long, requires = "orders")]
    pub order_products: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Project directory (where northstar.yaml is looked up)
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Explicit configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Execution profile: dev | ci | prod
    #[arg(long, env = "NORTHSTAR_ENV", default_value = "dev")]
    pub profile: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentBy {
    /// Order-frequency bands from the configuration
    Frequency,
    /// Quartiles of average basket size
    Basket,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the full analysis (quality gate -> metrics -> segments -> decomposition -> report)
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Per-user aggregate CSV of the previous period
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Label of the current period
        #[arg(long, default_value = "current")]
        period: String,

        /// Label of the baseline period
        #[arg(long, default_value = "baseline")]
        baseline_period: String,

        /// Output directory for run_report.json and business_review.md
        #[arg(long, default_value = "target")]
        target: PathBuf,

        /// Custom business review template (minijinja)
        #[arg(long)]
        template: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// 🛡️ Runs the data quality checks only
    Quality {
        #[command(flatten)]
        input: InputArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// 👥 Prints customer segments
    Segments {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum, default_value = "frequency")]
        by: SegmentBy,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// 🔀 Decomposes a VPAC change from explicit driver values
    Decompose {
        /// Start period: orders per customer, items per order
        #[arg(long, num_args = 2, value_names = ["OPC", "IPO"], allow_negative_numbers = true, required = true)]
        from: Vec<f64>,

        /// End period: orders per customer, items per order
        #[arg(long, num_args = 2, value_names = ["OPC", "IPO"], allow_negative_numbers = true, required = true)]
        to: Vec<f64>,

        #[arg(long, default_value = "Period 1")]
        from_label: String,

        #[arg(long, default_value = "Period 2")]
        to_label: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// 📚 Lists the metric catalog
    Metrics,
}
