// northstar-core/src/domain/quality/checks.rs

use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::domain::config::{AnalysisConfig, OutlierStrategy, Relation};
use crate::domain::quality::outliers::{OutlierDetector, OutlierMethod};
use crate::domain::quality::result::{QualityCheckResult, QualityReport, Severity};
use crate::domain::stats::safe_div;
use crate::domain::table::{AggregateTable, Column};

/// Max number of offending user ids kept in a result's details.
const SAMPLE_LIMIT: usize = 20;

/// Absolute gap allowed between `avg_basket_size` and items/orders (CSV rounding).
const BASKET_TOLERANCE: f64 = 0.01;

/// Validates a per-user aggregate table against the domain invariants.
#[derive(Debug, Clone)]
pub struct QualityChecker {
    config: AnalysisConfig,
}

impl QualityChecker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Empty table is an ERROR; fewer rows than `min_sample_size` is a WARNING.
    pub fn check_row_count(&self, table: &AggregateTable) -> QualityCheckResult {
        let rows = table.len();
        let min = self.config.min_sample_size;
        let details = json!({ "row_count": rows, "min_sample_size": min });

        let result = if rows == 0 {
            QualityCheckResult::new("row_count", vec![], false, Severity::Error, "Table is empty")
        } else if rows < min {
            QualityCheckResult::new(
                "row_count",
                vec![],
                false,
                Severity::Warning,
                format!("Only {} rows (minimum sample size: {})", rows, min),
            )
        } else {
            QualityCheckResult::new(
                "row_count",
                vec![],
                true,
                Severity::Error,
                format!("{} rows", rows),
            )
        };
        result.with_details(details)
    }

    pub fn check_unique_users(&self, table: &AggregateTable) -> QualityCheckResult {
        let mut seen = HashSet::new();
        let mut duplicates: Vec<&str> = Vec::new();
        for id in table.user_ids() {
            if !seen.insert(id) && !duplicates.contains(&id) {
                duplicates.push(id);
            }
        }

        let passed = duplicates.is_empty();
        let message = if passed {
            "user_id is unique".to_string()
        } else {
            format!("{} user_id value(s) appear more than once", duplicates.len())
        };
        QualityCheckResult::new("unique_users", vec![], passed, Severity::Error, message)
            .with_details(json!({ "duplicates": sample(&duplicates) }))
    }

    /// Fails when the null fraction exceeds `max_rate`. Nulls are expected in columns
    /// that are nullable by design, so there the failure is only a WARNING.
    pub fn check_null_rate(
        &self,
        table: &AggregateTable,
        column: Column,
        max_rate: f64,
    ) -> QualityCheckResult {
        let values = table.column(column);
        let nulls = values.iter().filter(|v| v.is_none()).count();
        let rate = safe_div(nulls as f64, values.len() as f64);
        let passed = rate <= max_rate;
        let severity = if column.is_nullable_by_design() {
            Severity::Warning
        } else {
            Severity::Error
        };

        QualityCheckResult::new(
            format!("null_rate_{}", column),
            vec![column],
            passed,
            severity,
            format!(
                "'{}' null rate {:.1}% (max {:.1}%)",
                column,
                rate * 100.0,
                max_rate * 100.0
            ),
        )
        .with_details(json!({ "null_count": nulls, "null_rate": rate, "max_rate": max_rate }))
    }

    /// ERROR when any non-null value falls outside `[min, max]`. Either bound may be open.
    pub fn check_numeric_range(
        &self,
        table: &AggregateTable,
        column: Column,
        min: Option<f64>,
        max: Option<f64>,
    ) -> QualityCheckResult {
        let offenders: Vec<&str> = table
            .rows()
            .iter()
            .filter(|row| {
                row.value(column).is_some_and(|v| {
                    min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m)
                })
            })
            .map(|row| row.user_id.as_str())
            .collect();

        let bounds = format!(
            "[{}, {}]",
            min.map_or("-inf".to_string(), |m| m.to_string()),
            max.map_or("+inf".to_string(), |m| m.to_string())
        );
        let passed = offenders.is_empty();
        QualityCheckResult::new(
            format!("range_{}", column),
            vec![column],
            passed,
            Severity::Error,
            format!(
                "'{}' expected in {}: {} violation(s)",
                column,
                bounds,
                offenders.len()
            ),
        )
        .with_details(json!({
            "min": min,
            "max": max,
            "violations": offenders.len(),
            "sample": sample(&offenders),
        }))
    }

    /// ERROR when `left relation right` does not hold for some row.
    /// Rows where either side is null are not compared.
    pub fn check_monotonic(
        &self,
        table: &AggregateTable,
        left: Column,
        right: Column,
        relation: Relation,
    ) -> QualityCheckResult {
        let offenders: Vec<&str> = table
            .rows()
            .iter()
            .filter(|row| match (row.value(left), row.value(right)) {
                (Some(a), Some(b)) => !relation.holds(a, b),
                _ => false,
            })
            .map(|row| row.user_id.as_str())
            .collect();

        let rate = safe_div(offenders.len() as f64, table.len() as f64);
        QualityCheckResult::new(
            format!("monotonic_{}_{}", left, right),
            vec![left, right],
            offenders.is_empty(),
            Severity::Error,
            format!(
                "{} {} {}: {} violation(s) ({:.1}%)",
                left,
                relation,
                right,
                offenders.len(),
                rate * 100.0
            ),
        )
        .with_details(json!({
            "relation": relation.symbol(),
            "violations": offenders.len(),
            "violation_rate": rate,
            "sample": sample(&offenders),
        }))
    }

    /// `avg_basket_size` must agree with items/orders.
    pub fn check_basket_consistency(&self, table: &AggregateTable) -> QualityCheckResult {
        let offenders: Vec<&str> = table
            .rows()
            .iter()
            .filter(|row| row.orders > 0)
            .filter(|row| {
                let gap = (row.avg_basket_size - row.items as f64 / row.orders as f64).abs();
                gap.is_nan() || gap > BASKET_TOLERANCE
            })
            .map(|row| row.user_id.as_str())
            .collect();

        QualityCheckResult::new(
            "basket_consistency",
            vec![Column::AvgBasketSize, Column::Items, Column::Orders],
            offenders.is_empty(),
            Severity::Error,
            format!(
                "avg_basket_size = items / orders: {} violation(s)",
                offenders.len()
            ),
        )
        .with_details(json!({ "violations": offenders.len(), "sample": sample(&offenders) }))
    }

    /// User ids whose value in `column` is an outlier under `method`.
    pub fn detect_outliers(
        &self,
        table: &AggregateTable,
        column: Column,
        method: OutlierMethod,
    ) -> Vec<String> {
        let present: Vec<(&str, f64)> = table
            .rows()
            .iter()
            .filter_map(|row| row.value(column).map(|v| (row.user_id.as_str(), v)))
            .collect();
        let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();

        OutlierDetector::flag(&values, method)
            .into_iter()
            .map(|i| present[i].0.to_string())
            .collect()
    }

    /// Outliers as an advisory result: never blocking.
    pub fn check_outliers(
        &self,
        table: &AggregateTable,
        column: Column,
        method: OutlierMethod,
    ) -> QualityCheckResult {
        let flagged = self.detect_outliers(table, column, method);
        let flagged_refs: Vec<&str> = flagged.iter().map(String::as_str).collect();
        QualityCheckResult::new(
            format!("outliers_{}", column),
            vec![column],
            flagged.is_empty(),
            Severity::Warning,
            format!("'{}' ({}): {} outlier(s)", column, method, flagged.len()),
        )
        .with_details(json!({
            "method": method,
            "flagged": flagged.len(),
            "sample": sample(&flagged_refs),
        }))
    }

    /// The configured detector with its configured threshold.
    pub fn outlier_method(&self) -> OutlierMethod {
        match self.config.outlier_method {
            OutlierStrategy::ZScore => OutlierMethod::ZScore {
                threshold: self.config.outlier_z_threshold,
            },
            OutlierStrategy::Iqr => OutlierMethod::Iqr {
                multiplier: self.config.outlier_iqr_multiplier,
            },
        }
    }

    /// Runs the full suite in a fixed order.
    pub fn run_all(&self, table: &AggregateTable, dataset: &str) -> QualityReport {
        let mut results = vec![self.check_row_count(table), self.check_unique_users(table)];

        for column in Column::ALL {
            results.push(self.check_null_rate(table, column, self.config.max_null_rate));
        }

        for (column, min, max) in [
            (Column::Orders, Some(1.0), None),
            (Column::Items, Some(0.0), None),
            (Column::AvgBasketSize, Some(0.0), None),
            (Column::ReorderRate, Some(0.0), Some(1.0)),
            (Column::SmallBasketShare, Some(0.0), Some(1.0)),
            (Column::MedianDaysSincePrior, Some(0.0), None),
            (Column::LifetimeOrders, Some(1.0), None),
        ] {
            results.push(self.check_numeric_range(table, column, min, max));
        }

        for rule in &self.config.monotonic_relationships {
            results.push(self.check_monotonic(table, rule.left, rule.right, rule.relation));
        }

        results.push(self.check_basket_consistency(table));

        let method = self.outlier_method();
        for column in [Column::Orders, Column::AvgBasketSize] {
            results.push(self.check_outliers(table, column, method));
        }

        let report = QualityReport::new(dataset, results);
        for failure in report.failures() {
            match failure.severity {
                Severity::Error => warn!(check = %failure.check_name, "Quality ERROR: {}", failure.message),
                Severity::Warning => warn!(check = %failure.check_name, "Quality warning: {}", failure.message),
            }
        }
        debug!(
            dataset,
            passed = report.summary.passed,
            warnings = report.summary.warnings,
            errors = report.summary.errors,
            "Quality checks completed"
        );
        report
    }
}

fn sample(ids: &[&str]) -> Vec<String> {
    ids.iter().take(SAMPLE_LIMIT).map(|s| s.to_string()).collect()
}
