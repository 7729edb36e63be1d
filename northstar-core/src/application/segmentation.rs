// northstar-core/src/application/segmentation.rs

use tracing::{debug, instrument};

use crate::application::engine::MetricEngine;
use crate::domain::error::DomainError;
use crate::domain::metrics::catalog::{ITEMS_PER_ORDER, ORDERS_PER_CUSTOMER, VPAC};
use crate::domain::segmentation::{SegmentSummary, SegmentationBands};
use crate::domain::stats::{quantile, safe_div};
use crate::domain::table::{AggregateTable, Column, PerUserAggregate};

/// Splits customers into order-frequency bands and computes the VPAC drivers per band
/// with the same rules as the whole-table metrics.
#[instrument(skip_all, fields(rows = table.len(), bands = bands.bands().len()))]
pub fn segment(
    table: &AggregateTable,
    bands: &SegmentationBands,
    engine: &MetricEngine,
) -> Result<Vec<SegmentSummary>, DomainError> {
    if let Some(row) = table.rows().iter().find(|r| r.orders < 1) {
        return Err(DomainError::InvalidInput(format!(
            "user '{}' has {} orders; segmentation requires at least 1",
            row.user_id, row.orders
        )));
    }

    bands
        .bands()
        .iter()
        .map(|band| {
            let subset = table.filter(|r| band.contains(r.orders));
            summarize(&band.label, band.range_label(), &subset, table, engine)
        })
        .collect()
}

/// Quartile bands over `avg_basket_size`: Small (<= Q1), Medium (<= Q2), Large (<= Q3), XL.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn segment_by_basket_size(
    table: &AggregateTable,
    engine: &MetricEngine,
) -> Result<Vec<SegmentSummary>, DomainError> {
    let sizes = table.present_values(Column::AvgBasketSize);
    let q1 = quantile(&sizes, 0.25);
    let q2 = quantile(&sizes, 0.50);
    let q3 = quantile(&sizes, 0.75);
    debug!(q1, q2, q3, "Basket size quartiles");

    let bands: [(&str, String, Box<dyn Fn(&PerUserAggregate) -> bool>); 4] = [
        (
            "Small Basket",
            format!("<= {:.2}", q1),
            Box::new(move |r: &PerUserAggregate| r.avg_basket_size <= q1),
        ),
        (
            "Medium Basket",
            format!("({:.2}, {:.2}]", q1, q2),
            Box::new(move |r: &PerUserAggregate| r.avg_basket_size > q1 && r.avg_basket_size <= q2),
        ),
        (
            "Large Basket",
            format!("({:.2}, {:.2}]", q2, q3),
            Box::new(move |r: &PerUserAggregate| r.avg_basket_size > q2 && r.avg_basket_size <= q3),
        ),
        (
            "XL Basket",
            format!("> {:.2}", q3),
            Box::new(move |r: &PerUserAggregate| r.avg_basket_size > q3),
        ),
    ];

    bands
        .into_iter()
        .map(|(label, range, predicate)| {
            let subset = table.filter(|r| predicate(r));
            summarize(label, range, &subset, table, engine)
        })
        .collect()
}

fn summarize(
    label: &str,
    range: String,
    subset: &AggregateTable,
    whole: &AggregateTable,
    engine: &MetricEngine,
) -> Result<SegmentSummary, DomainError> {
    let summary = SegmentSummary {
        segment: label.to_string(),
        range,
        customers: subset.len(),
        orders: subset.total_orders(),
        items: subset.total_items(),
        customer_share: safe_div(subset.len() as f64, whole.len() as f64),
        order_share: safe_div(subset.total_orders() as f64, whole.total_orders() as f64),
        item_share: safe_div(subset.total_items() as f64, whole.total_items() as f64),
        orders_per_customer: engine.compute_one(ORDERS_PER_CUSTOMER, subset)?,
        items_per_order: engine.compute_one(ITEMS_PER_ORDER, subset)?,
        vpac: engine.compute_one(VPAC, subset)?,
    };
    debug!(segment = %summary.segment, customers = summary.customers, vpac = summary.vpac, "Segment summarized");
    Ok(summary)
}
