// northstar-core/src/domain/metrics/definition.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::graph::DependencyNode;
use crate::domain::table::AggregateTable;

/// Level of aggregation a metric is defined at.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grain {
    User,
    Order,
    Overall,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    NorthStar,
    Driver,
    Guardrail,
    Diagnostic,
}

/// Audience of a metric: P0/P1 land in the executive layer, P2/P3 in diagnostics.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    P0,
    P1,
    P2,
    P3,
}

impl Tier {
    pub fn is_executive(&self) -> bool {
        matches!(self, Tier::P0 | Tier::P1)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    HigherIsBetter,
    LowerIsBetter,
    Neutral,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricStatus {
    Ok,
    Breach,
    Error,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Thresholds {
    pub fn status(&self, value: f64) -> MetricStatus {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            MetricStatus::Breach
        } else {
            MetricStatus::Ok
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricError {
    #[error("dependency '{0}' has no computed value")]
    MissingDependency(String),

    #[error("metric expects {expected:?} grain but the aggregate table is per-user")]
    GrainMismatch { expected: Grain },

    #[error("computation produced a non-finite value ({0})")]
    NonFinite(f64),

    #[error("{0}")]
    Rule(String),
}

/// What a computation rule sees: the table and the values computed so far.
pub struct MetricContext<'a> {
    table: &'a AggregateTable,
    computed: &'a BTreeMap<String, f64>,
}

impl<'a> MetricContext<'a> {
    pub fn new(table: &'a AggregateTable, computed: &'a BTreeMap<String, f64>) -> Self {
        Self { table, computed }
    }

    pub fn table(&self) -> &AggregateTable {
        self.table
    }

    pub fn dependency(&self, id: &str) -> Result<f64, MetricError> {
        self.computed
            .get(id)
            .copied()
            .ok_or_else(|| MetricError::MissingDependency(id.to_string()))
    }
}

pub type ComputeFn = fn(&MetricContext<'_>) -> Result<f64, MetricError>;

/// Declarative description of one computable KPI.
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub id: String,
    pub display_name: String,
    pub grain: Grain,
    pub kind: MetricKind,
    pub tier: Tier,
    pub directionality: Directionality,
    pub formula: String,
    pub description: String,
    pub unit: String,
    pub owner: String,
    pub thresholds: Thresholds,
    pub dependencies: Vec<String>,
    compute: ComputeFn,
}

impl MetricDefinition {
    pub fn new(id: &str, display_name: &str, kind: MetricKind, compute: ComputeFn) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            grain: Grain::Overall,
            kind,
            tier: Tier::P2,
            directionality: Directionality::HigherIsBetter,
            formula: String::new(),
            description: String::new(),
            unit: String::new(),
            owner: String::new(),
            thresholds: Thresholds::default(),
            dependencies: Vec::new(),
            compute,
        }
    }

    pub fn grain(mut self, grain: Grain) -> Self {
        self.grain = grain;
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn directionality(mut self, directionality: Directionality) -> Self {
        self.directionality = directionality;
        self
    }

    pub fn formula(mut self, formula: &str) -> Self {
        self.formula = formula.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.thresholds.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.thresholds.max = Some(max);
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Runs the rule with grain enforcement and a finiteness guard.
    pub fn evaluate(&self, ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
        // The aggregate table is keyed by user; order-level rows are not available.
        if self.grain == Grain::Order {
            return Err(MetricError::GrainMismatch {
                expected: Grain::Order,
            });
        }

        let value = (self.compute)(ctx)?;
        if !value.is_finite() {
            return Err(MetricError::NonFinite(value));
        }
        Ok(value)
    }
}

impl DependencyNode for MetricDefinition {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn node_dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::table::PerUserAggregate;

    fn constant(_: &MetricContext<'_>) -> Result<f64, MetricError> {
        Ok(42.0)
    }

    fn infinite(_: &MetricContext<'_>) -> Result<f64, MetricError> {
        Ok(f64::INFINITY)
    }

    #[test]
    fn test_thresholds_status() {
        let t = Thresholds {
            min: Some(0.0),
            max: Some(1.0),
        };
        assert_eq!(t.status(0.0), MetricStatus::Ok);
        assert_eq!(t.status(1.0), MetricStatus::Ok);
        assert_eq!(t.status(1.01), MetricStatus::Breach);
        assert_eq!(t.status(-0.1), MetricStatus::Breach);
        assert_eq!(Thresholds::default().status(-1e9), MetricStatus::Ok);
    }

    #[test]
    fn test_evaluate_rejects_non_finite() {
        let table = AggregateTable::new(vec![PerUserAggregate::from_counts("u1", 1, 1)]);
        let computed = BTreeMap::new();
        let ctx = MetricContext::new(&table, &computed);

        let def = MetricDefinition::new("bad", "Bad", MetricKind::Diagnostic, infinite);
        assert!(matches!(def.evaluate(&ctx), Err(MetricError::NonFinite(_))));
    }

    #[test]
    fn test_evaluate_enforces_order_grain() {
        let table = AggregateTable::default();
        let computed = BTreeMap::new();
        let ctx = MetricContext::new(&table, &computed);

        let def = MetricDefinition::new("per_order", "Per Order", MetricKind::Diagnostic, constant)
            .grain(Grain::Order);
        assert_eq!(
            def.evaluate(&ctx),
            Err(MetricError::GrainMismatch {
                expected: Grain::Order
            })
        );

        let overall = MetricDefinition::new("c", "C", MetricKind::Diagnostic, constant);
        assert_eq!(overall.evaluate(&ctx).unwrap(), 42.0);
    }

    #[test]
    fn test_context_dependency_lookup() {
        let table = AggregateTable::default();
        let mut computed = BTreeMap::new();
        computed.insert("orders_per_customer".to_string(), 3.0);
        let ctx = MetricContext::new(&table, &computed);

        assert_eq!(ctx.dependency("orders_per_customer").unwrap(), 3.0);
        assert_eq!(
            ctx.dependency("items_per_order"),
            Err(MetricError::MissingDependency("items_per_order".into()))
        );
    }
}
