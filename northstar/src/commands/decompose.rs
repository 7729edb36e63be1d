// northstar/src/commands/decompose.rs
//
// USE CASE: Attribute a VPAC change to its two drivers from explicit values.

use anyhow::bail;
use comfy_table::Cell;

use northstar_core::domain::decomposition::{
    Decomposer, DecompositionResult, DriverPair, StepKind, WaterfallStep, attribution_view,
};

use crate::cli::ConfigArgs;
use crate::commands::{load_config, new_table};

pub struct DecomposeArgs {
    pub from: Vec<f64>,
    pub to: Vec<f64>,
    pub from_label: String,
    pub to_label: String,
    pub config: ConfigArgs,
}

pub fn execute(args: DecomposeArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let decomposer = Decomposer::new(config.decomposition_tolerance);

    let start = driver_pair(&args.from)?;
    let end = driver_pair(&args.to)?;
    let result = decomposer.decompose_labeled(&args.from_label, start, &args.to_label, end)?;
    decomposer.ensure_valid(&result)?;

    println!(
        "\n🔀 VPAC {} -> {}: {:.2} -> {:.2} ({:+.2}, {:+.1}%)",
        result.period_1,
        result.period_2,
        result.north_star_start,
        result.north_star_end,
        result.total_change,
        result.percent_change * 100.0
    );

    let mut table = new_table(vec!["Step", "Change", "Cumulative", "Share of change"]);
    for step in attribution_view(&result) {
        table.add_row(vec![
            Cell::new(&step.label),
            Cell::new(format!("{:+.2}", step.delta)),
            Cell::new(format!("{:.2}", step.cumulative)),
            Cell::new(share_label(&result, &step)),
        ]);
    }
    println!("{table}");
    println!(
        "✅ Terms sum to the total change (tolerance {})",
        decomposer.tolerance()
    );
    Ok(())
}

fn driver_pair(values: &[f64]) -> anyhow::Result<DriverPair> {
    match values {
        [orders_per_customer, items_per_order] => {
            Ok(DriverPair::new(*orders_per_customer, *items_per_order))
        }
        _ => bail!("Expected two values: orders per customer and items per order"),
    }
}

/// Share of the total change carried by a bar; start and end are levels, not changes.
fn share_label(result: &DecompositionResult, step: &WaterfallStep) -> String {
    match step.kind {
        StepKind::Start | StepKind::End => String::new(),
        StepKind::Driver | StepKind::Interaction => {
            format!("{:.1}%", result.share_of_change(step.delta) * 100.0)
        }
    }
}
