// northstar-core/src/domain/metrics/snapshot.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::error::DomainError;
use crate::domain::metrics::definition::{MetricKind, MetricStatus, Tier};

/// A metric whose rule failed during an engine run. Isolated: the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationFailure {
    pub metric_id: String,
    pub reason: String,
}

/// Values computed for one period. Immutable once built by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    period: String,
    computed_at: DateTime<Utc>,
    values: BTreeMap<String, f64>,
    failures: Vec<ComputationFailure>,
}

impl MetricSnapshot {
    pub fn new(
        period: impl Into<String>,
        values: BTreeMap<String, f64>,
        failures: Vec<ComputationFailure>,
    ) -> Self {
        Self {
            period: period.into(),
            computed_at: Utc::now(),
            values,
            failures,
        }
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }

    /// Like `get`, but a missing value is an error naming the period.
    pub fn require(&self, id: &str) -> Result<f64, DomainError> {
        self.get(id)
            .ok_or_else(|| DomainError::MetricUnavailable(id.to_string(), self.period.clone()))
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn failures(&self) -> &[ComputationFailure] {
        &self.failures
    }

    /// True when at least one metric failed and was left out.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One row of the engine's result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: String,
    pub display_name: String,
    pub kind: MetricKind,
    pub tier: Tier,
    pub unit: String,
    pub owner: String,
    pub formula: String,
    pub value: Option<f64>,
    pub status: MetricStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDelta {
    pub metric_id: String,
    pub period_1: f64,
    pub period_2: f64,
    pub absolute_delta: f64,
    /// Fraction (0.25 = +25%). 0.0 when period 1 is zero.
    pub percent_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub period_1: String,
    pub period_2: String,
    pub deltas: Vec<PeriodDelta>,
    /// Ids present in only one of the two snapshots.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentValue {
    pub id: String,
    pub display_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NorthStarSummary {
    pub id: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub owner: String,
    pub formula: String,
    pub components: Vec<ComponentValue>,
}
