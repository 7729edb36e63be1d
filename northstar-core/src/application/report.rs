// northstar-core/src/application/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::engine::MetricLayers;
use crate::domain::config::Profile;
use crate::domain::decomposition::{DecompositionResult, WaterfallStep};
use crate::domain::metrics::catalog::REORDER_RATE;
use crate::domain::metrics::{
    ComputationFailure, MetricKind, MetricStatus, NorthStarSummary, PeriodComparison,
};
use crate::domain::quality::QualityReport;
use crate::domain::segmentation::SegmentSummary;

/// What the two sides of the decomposition are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonBasis {
    /// Baseline table against the current table.
    Periods,
    /// Customers at or below the median order count against those above it.
    FrequencyCohorts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionSection {
    pub basis: ComparisonBasis,
    pub result: DecompositionResult,
    pub waterfall: Vec<WaterfallStep>,
    /// Metric-by-metric deltas; only for period comparisons.
    pub comparison: Option<PeriodComparison>,
    pub baseline_quality: Option<QualityReport>,
}

/// Everything one pipeline run produced. Serialized as `run_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub period: String,
    pub profile: Profile,
    pub north_star: Vec<NorthStarSummary>,
    pub layers: MetricLayers,
    pub failures: Vec<ComputationFailure>,
    pub segments: Vec<SegmentSummary>,
    pub basket_segments: Vec<SegmentSummary>,
    pub quality: QualityReport,
    pub decomposition: Option<DecompositionSection>,
    pub insights: Vec<String>,
}

impl RunReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Short narrative lines for the business review, derived from the computed numbers.
pub fn key_insights(
    layers: &MetricLayers,
    segments: &[SegmentSummary],
    decomposition: Option<&DecompositionSection>,
) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(top) = segments.last().filter(|s| s.customers > 0) {
        insights.push(format!(
            "{} customers drive {:.1}% of total orders while being {:.1}% of customers.",
            top.segment,
            top.order_share * 100.0,
            top.customer_share * 100.0
        ));
    }

    let records = || layers.executive.iter().chain(layers.diagnostic.iter());

    if let Some(rate) = records()
        .find(|r| r.id == REORDER_RATE)
        .and_then(|r| r.value)
    {
        insights.push(format!(
            "Reorder rate at {:.1}% of items purchased.",
            rate * 100.0
        ));
    }

    let breaches: Vec<&str> = records()
        .filter(|r| r.kind == MetricKind::Guardrail && r.status == MetricStatus::Breach)
        .map(|r| r.display_name.as_str())
        .collect();
    if breaches.is_empty() {
        insights.push("All guardrail metrics are within their thresholds.".to_string());
    } else {
        insights.push(format!("Guardrail breach: {}.", breaches.join(", ")));
    }

    if let Some(section) = decomposition {
        let result = &section.result;
        if result.total_change != 0.0 {
            let (driver, contribution) =
                if result.driver_a_contribution.abs() >= result.driver_b_contribution.abs() {
                    (&result.driver_a, result.driver_a_contribution)
                } else {
                    (&result.driver_b, result.driver_b_contribution)
                };
            insights.push(format!(
                "{} explains {:.0}% of the {:+.2} change in the North Star ({} vs {}).",
                driver,
                result.share_of_change(contribution) * 100.0,
                result.total_change,
                result.period_2,
                result.period_1
            ));
        }
    }

    insights
}
