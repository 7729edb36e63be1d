// northstar/src/commands/segments.rs
//
// USE CASE: Print customer segments with their VPAC drivers.

use comfy_table::Cell;

use northstar_core::application::{MetricEngine, segment, segment_by_basket_size};
use northstar_core::domain::metrics::build_registry;
use northstar_core::domain::segmentation::SegmentationBands;
use northstar_core::ports::AggregateSource;

use crate::cli::{ConfigArgs, InputArgs, SegmentBy};
use crate::commands::{load_config, new_table, open_source};

pub fn execute(input: InputArgs, by: SegmentBy, config: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let bands = SegmentationBands::new(config.segmentation_bands.clone())?;
    let engine = MetricEngine::new(build_registry()?);

    let source = open_source(&input, &config)?;
    let table = source.load()?;

    let segments = match by {
        SegmentBy::Frequency => segment(&table, &bands, &engine)?,
        SegmentBy::Basket => segment_by_basket_size(&table, &engine)?,
    };

    println!("\n👥 {} customers from {}", table.len(), source.describe());
    let mut out = new_table(vec![
        "Segment",
        "Range",
        "Customers",
        "Customer share",
        "Order share",
        "Orders/customer",
        "Items/order",
        "VPAC",
    ]);
    for s in &segments {
        out.add_row(vec![
            Cell::new(&s.segment),
            Cell::new(&s.range),
            Cell::new(s.customers),
            Cell::new(format!("{:.1}%", s.customer_share * 100.0)),
            Cell::new(format!("{:.1}%", s.order_share * 100.0)),
            Cell::new(format!("{:.2}", s.orders_per_customer)),
            Cell::new(format!("{:.2}", s.items_per_order)),
            Cell::new(format!("{:.2}", s.vpac)),
        ]);
    }
    println!("{out}");
    Ok(())
}
