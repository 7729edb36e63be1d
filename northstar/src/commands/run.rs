// northstar/src/commands/run.rs
//
// USE CASE: Run the full analysis and write the report artifacts.

use anyhow::Context;
use comfy_table::Cell;
use std::path::PathBuf;

use northstar_core::application::{RunOptions, RunReport, run_pipeline};
use northstar_core::infrastructure::adapters::DuckDbSource;
use northstar_core::infrastructure::config::parse_profile;
use northstar_core::infrastructure::report::MarkdownRenderer;
use northstar_core::ports::AggregateSource;

use crate::cli::{ConfigArgs, InputArgs};
use crate::commands::{load_config, new_table, open_source};

pub struct RunArgs {
    pub input: InputArgs,
    pub baseline: Option<PathBuf>,
    pub period: String,
    pub baseline_period: String,
    pub target: PathBuf,
    pub template: Option<PathBuf>,
    pub config: ConfigArgs,
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = load_config(&args.config)?;
    let profile = parse_profile(&args.config.profile)?;
    println!("   Profile: {}", args.config.profile);

    // B. Instantiate the adapters (DuckDB sources, Markdown renderer)
    let current = open_source(&args.input, &config)?;
    let baseline = args
        .baseline
        .as_ref()
        .map(DuckDbSource::from_aggregates)
        .transpose()
        .context("Failed to open baseline aggregate table")?;
    let renderer = match &args.template {
        Some(path) => MarkdownRenderer::from_file(path)
            .with_context(|| format!("Failed to load report template {:?}", path))?,
        None => MarkdownRenderer::new()?,
    };

    // C. Run the Pipeline (Application Layer)
    let options = RunOptions {
        period: args.period,
        baseline_period: args.baseline_period,
        profile,
        target_dir: args.config.project_dir.join(&args.target),
    };
    let outcome = run_pipeline(
        &current,
        baseline.as_ref().map(|s| s as &dyn AggregateSource),
        &renderer,
        &config,
        &options,
    )?;

    print_summary(&outcome.report);
    for path in &outcome.artifacts {
        println!("   📄 {}", path.display());
    }
    println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    for ns in &report.north_star {
        println!("⭐ {}: {:.2} {}", ns.display_name, ns.value, ns.unit);
        for component in &ns.components {
            println!("   - {}: {:.2}", component.display_name, component.value);
        }
    }

    if let Some(section) = &report.decomposition {
        let result = &section.result;
        println!(
            "\n🔀 {} -> {}: {:+.2} ({:+.1}%)",
            result.period_1,
            result.period_2,
            result.total_change,
            result.percent_change * 100.0
        );
        let mut table = new_table(vec!["Step", "Change", "Cumulative"]);
        for step in &section.waterfall {
            table.add_row(vec![
                Cell::new(&step.label),
                Cell::new(format!("{:+.2}", step.delta)),
                Cell::new(format!("{:.2}", step.cumulative)),
            ]);
        }
        println!("{table}");
    }

    for failure in &report.failures {
        println!("⚠️  {} failed: {}", failure.metric_id, failure.reason);
    }
}
