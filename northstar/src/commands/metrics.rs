// northstar/src/commands/metrics.rs
//
// USE CASE: List the metric catalog in evaluation order.

use comfy_table::Cell;

use northstar_core::domain::metrics::build_registry;

use crate::commands::new_table;

pub fn execute() -> anyhow::Result<()> {
    let registry = build_registry()?;

    println!("\n📚 {} metrics (evaluation order)", registry.len());
    let mut table = new_table(vec![
        "Id", "Name", "Kind", "Tier", "Grain", "Unit", "Owner", "Bounds", "Depends on",
    ]);
    for def in registry.evaluation_order() {
        let bounds = format!(
            "[{}, {}]",
            def.thresholds.min.map_or("-".to_string(), |v| v.to_string()),
            def.thresholds.max.map_or("-".to_string(), |v| v.to_string())
        );
        table.add_row(vec![
            Cell::new(&def.id),
            Cell::new(&def.display_name),
            Cell::new(format!("{:?}", def.kind)),
            Cell::new(format!("{:?}", def.tier)),
            Cell::new(format!("{:?}", def.grain)),
            Cell::new(&def.unit),
            Cell::new(&def.owner),
            Cell::new(bounds),
            Cell::new(def.dependencies.join(", ")),
        ]);
    }
    println!("{table}");
    Ok(())
}
