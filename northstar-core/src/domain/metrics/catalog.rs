// northstar-core/src/domain/metrics/catalog.rs
//
// The canonical KPI catalog. Rules are plain functions over the per-user table.

use crate::domain::metrics::definition::{
    Directionality, MetricContext, MetricDefinition, MetricError, MetricKind, Tier,
};
use std::collections::HashSet;

use crate::domain::stats;
use crate::domain::table::Column;

pub const VPAC: &str = "vpac";
pub const ACTIVE_CUSTOMERS: &str = "active_customers";
pub const ORDERS_PER_CUSTOMER: &str = "orders_per_customer";
pub const ITEMS_PER_ORDER: &str = "items_per_order";
pub const TOTAL_ORDERS: &str = "total_orders";
pub const TOTAL_ITEMS: &str = "total_items";
pub const REORDER_RATE: &str = "reorder_rate";
pub const SMALL_BASKET_SHARE: &str = "small_basket_share";
pub const MEDIAN_DAYS_SINCE_PRIOR: &str = "median_days_since_prior";

fn column_mean(ctx: &MetricContext<'_>, column: Column) -> f64 {
    stats::mean(&ctx.table().present_values(column))
}

/// Distinct user ids; a repeated id counts once.
pub fn active_customers(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    let distinct: HashSet<&str> = ctx.table().user_ids().collect();
    Ok(distinct.len() as f64)
}

pub fn total_orders(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(ctx.table().total_orders() as f64)
}

pub fn total_items(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(ctx.table().total_items() as f64)
}

/// Purchase frequency: mean of per-user order counts.
pub fn orders_per_customer(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(column_mean(ctx, Column::Orders))
}

/// Basket depth: mean of per-user average basket sizes.
pub fn items_per_order(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(column_mean(ctx, Column::AvgBasketSize))
}

/// North Star: product of the two already-computed drivers.
pub fn vpac(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(ctx.dependency(ORDERS_PER_CUSTOMER)? * ctx.dependency(ITEMS_PER_ORDER)?)
}

pub fn reorder_rate(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(column_mean(ctx, Column::ReorderRate))
}

pub fn small_basket_share(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(column_mean(ctx, Column::SmallBasketShare))
}

/// Median over customers with a prior order; single-order customers (null) are excluded.
pub fn median_days_since_prior(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
    Ok(stats::median(
        &ctx.table().present_values(Column::MedianDaysSincePrior),
    ))
}

/// Definitions in declaration order. Registry construction validates them.
pub fn standard_metrics() -> Vec<MetricDefinition> {
    vec![
        // North Star
        MetricDefinition::new(
            VPAC,
            "Value per Active Customer (VPAC)",
            MetricKind::NorthStar,
            vpac,
        )
        .tier(Tier::P0)
        .formula("Orders per Customer × Items per Order")
        .description("Value generated per active customer, combining purchase frequency and basket depth")
        .unit("items/customer")
        .owner("Product Growth")
        .min(0.0)
        .depends_on(&[ORDERS_PER_CUSTOMER, ITEMS_PER_ORDER]),
        // Drivers
        MetricDefinition::new(
            ACTIVE_CUSTOMERS,
            "Active Customers",
            MetricKind::Driver,
            active_customers,
        )
        .tier(Tier::P1)
        .formula("COUNT(DISTINCT user_id)")
        .description("Number of unique customers who placed at least one order")
        .unit("customers")
        .owner("Marketing / Acquisition")
        .min(1.0),
        MetricDefinition::new(
            ORDERS_PER_CUSTOMER,
            "Orders per Customer",
            MetricKind::Driver,
            orders_per_customer,
        )
        .tier(Tier::P1)
        .formula("AVG(orders per user)")
        .description("Average number of orders per active customer (purchase frequency)")
        .unit("orders/customer")
        .owner("Product / Retention")
        .min(1.0),
        MetricDefinition::new(
            ITEMS_PER_ORDER,
            "Items per Order",
            MetricKind::Driver,
            items_per_order,
        )
        .tier(Tier::P1)
        .formula("AVG(items per order)")
        .description("Average basket size (items per order)")
        .unit("items/order")
        .owner("Product / Merchandising")
        .min(1.0),
        // Supporting KPIs
        MetricDefinition::new(
            TOTAL_ORDERS,
            "Total Orders",
            MetricKind::Diagnostic,
            total_orders,
        )
        .tier(Tier::P3)
        .formula("SUM(orders)")
        .description("Total number of orders placed")
        .unit("orders")
        .owner("Product Growth")
        .min(0.0),
        MetricDefinition::new(
            TOTAL_ITEMS,
            "Total Items",
            MetricKind::Diagnostic,
            total_items,
        )
        .tier(Tier::P3)
        .formula("SUM(items)")
        .description("Total number of items ordered")
        .unit("items")
        .owner("Product Growth")
        .min(0.0),
        MetricDefinition::new(
            REORDER_RATE,
            "Reorder Rate",
            MetricKind::Diagnostic,
            reorder_rate,
        )
        .tier(Tier::P2)
        .formula("Reordered Items / Total Items")
        .description("Share of items that were previously purchased by the same customer")
        .unit("rate")
        .owner("Product / Retention")
        .min(0.0)
        .max(1.0),
        // Guardrails
        MetricDefinition::new(
            SMALL_BASKET_SHARE,
            "Small Basket Share",
            MetricKind::Guardrail,
            small_basket_share,
        )
        .tier(Tier::P2)
        .directionality(Directionality::LowerIsBetter)
        .formula("Orders with <= threshold items / Total Orders")
        .description("Share of small orders; a rising value signals low-quality acquisition")
        .unit("rate")
        .owner("Product / Merchandising")
        .max(0.3),
        MetricDefinition::new(
            MEDIAN_DAYS_SINCE_PRIOR,
            "Median Days Between Orders",
            MetricKind::Guardrail,
            median_days_since_prior,
        )
        .tier(Tier::P2)
        .directionality(Directionality::LowerIsBetter)
        .formula("MEDIAN(days_since_prior_order), first orders excluded")
        .description("Typical gap between consecutive orders (frequency health)")
        .unit("days")
        .owner("Lifecycle Marketing")
        .min(1.0),
    ]
}
