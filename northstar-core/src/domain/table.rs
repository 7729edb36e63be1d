// northstar-core/src/domain/table.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// One row per customer, as produced by the aggregation layer.
///
/// Counts are signed on purpose: a malformed upstream table must still load so the
/// quality checker can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerUserAggregate {
    pub user_id: String,
    pub orders: i64,
    pub items: i64,
    pub avg_basket_size: f64,
    pub reorder_rate: f64,
    pub small_basket_share: f64,
    /// Null only for single-order customers (no prior order to measure against).
    pub median_days_since_prior: Option<f64>,
    pub lifetime_orders: i64,
}

impl PerUserAggregate {
    /// Builds a consistent row from raw counts. Handy for fixtures and tests.
    pub fn from_counts(user_id: impl Into<String>, orders: i64, items: i64) -> Self {
        let avg_basket_size = if orders == 0 {
            0.0
        } else {
            items as f64 / orders as f64
        };
        Self {
            user_id: user_id.into(),
            orders,
            items,
            avg_basket_size,
            reorder_rate: 0.0,
            small_basket_share: 0.0,
            median_days_since_prior: None,
            lifetime_orders: orders,
        }
    }

    /// Column value; NaN in a float column reads as null.
    pub fn value(&self, column: Column) -> Option<f64> {
        let value = match column {
            Column::Orders => Some(self.orders as f64),
            Column::Items => Some(self.items as f64),
            Column::AvgBasketSize => Some(self.avg_basket_size),
            Column::ReorderRate => Some(self.reorder_rate),
            Column::SmallBasketShare => Some(self.small_basket_share),
            Column::MedianDaysSincePrior => self.median_days_since_prior,
            Column::LifetimeOrders => Some(self.lifetime_orders as f64),
        };
        value.filter(|v| !v.is_nan())
    }
}

/// Numeric columns of the per-user aggregate contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Orders,
    Items,
    AvgBasketSize,
    ReorderRate,
    SmallBasketShare,
    MedianDaysSincePrior,
    LifetimeOrders,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Orders,
        Column::Items,
        Column::AvgBasketSize,
        Column::ReorderRate,
        Column::SmallBasketShare,
        Column::MedianDaysSincePrior,
        Column::LifetimeOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Orders => "orders",
            Column::Items => "items",
            Column::AvgBasketSize => "avg_basket_size",
            Column::ReorderRate => "reorder_rate",
            Column::SmallBasketShare => "small_basket_share",
            Column::MedianDaysSincePrior => "median_days_since_prior",
            Column::LifetimeOrders => "lifetime_orders",
        }
    }

    /// First-order gaps are structurally missing, so nulls there are expected.
    pub fn is_nullable_by_design(&self) -> bool {
        matches!(self, Column::MedianDaysSincePrior)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("Unknown column '{}'", s)))
    }
}

/// The per-user aggregate table the core computes over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    rows: Vec<PerUserAggregate>,
}

impl AggregateTable {
    pub fn new(rows: Vec<PerUserAggregate>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PerUserAggregate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.user_id.as_str())
    }

    /// Projects a column, preserving nulls and row order.
    pub fn column(&self, column: Column) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.value(column)).collect()
    }

    /// Non-null values of a column.
    pub fn present_values(&self, column: Column) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.value(column)).collect()
    }

    pub fn filter<P>(&self, predicate: P) -> AggregateTable
    where
        P: Fn(&PerUserAggregate) -> bool,
    {
        AggregateTable {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    pub fn total_orders(&self) -> i64 {
        self.rows.iter().map(|r| r.orders).sum()
    }

    pub fn total_items(&self) -> i64 {
        self.rows.iter().map(|r| r.items).sum()
    }
}

impl FromIterator<PerUserAggregate> for AggregateTable {
    fn from_iter<I: IntoIterator<Item = PerUserAggregate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_column_roundtrip_names() {
        for column in Column::ALL {
            assert_eq!(column.as_str().parse::<Column>().unwrap(), column);
        }
        assert!("basket".parse::<Column>().is_err());
    }

    #[test]
    fn test_only_days_since_prior_is_nullable() {
        let nullable: Vec<_> = Column::ALL
            .into_iter()
            .filter(Column::is_nullable_by_design)
            .collect();
        assert_eq!(nullable, vec![Column::MedianDaysSincePrior]);
    }

    #[test]
    fn test_column_projection_keeps_nulls() {
        let mut repeat = PerUserAggregate::from_counts("u2", 3, 9);
        repeat.median_days_since_prior = Some(7.0);
        let table = AggregateTable::new(vec![PerUserAggregate::from_counts("u1", 1, 4), repeat]);

        assert_eq!(
            table.column(Column::MedianDaysSincePrior),
            vec![None, Some(7.0)]
        );
        assert_eq!(table.present_values(Column::MedianDaysSincePrior), vec![7.0]);
        assert_eq!(table.column(Column::AvgBasketSize), vec![Some(4.0), Some(3.0)]);
    }

    #[test]
    fn test_filter_and_totals() {
        let table: AggregateTable = vec![
            PerUserAggregate::from_counts("u1", 1, 2),
            PerUserAggregate::from_counts("u2", 6, 30),
            PerUserAggregate::from_counts("u3", 12, 50),
        ]
        .into_iter()
        .collect();

        let heavy = table.filter(|r| r.orders > 5);
        assert_eq!(heavy.len(), 2);
        assert_eq!(heavy.total_orders(), 18);
        assert_eq!(table.total_items(), 82);
        assert_eq!(heavy.user_ids().collect::<Vec<_>>(), vec!["u2", "u3"]);
    }
}
