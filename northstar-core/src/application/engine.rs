// northstar-core/src/application/engine.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::metrics::{
    ComponentValue, ComputationFailure, MetricContext, MetricKind, MetricRecord, MetricRegistry,
    MetricSnapshot, MetricStatus, NorthStarSummary, PeriodComparison, PeriodDelta,
};
use crate::domain::stats::safe_div;
use crate::domain::table::AggregateTable;

/// Executive (P0/P1) and diagnostic (P2/P3) views of a result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLayers {
    pub executive: Vec<MetricRecord>,
    pub diagnostic: Vec<MetricRecord>,
}

/// Evaluates registry metrics over an aggregate table.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    registry: MetricRegistry,
}

impl MetricEngine {
    pub fn new(registry: MetricRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Computes every metric in dependency order.
    /// A failing metric (and anything depending on it) is recorded and skipped; the
    /// rest of the run continues and the snapshot is flagged degraded.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub fn compute_all(&self, table: &AggregateTable, period: &str) -> MetricSnapshot {
        let start = Instant::now();
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        let mut failures = Vec::new();

        for def in self.registry.evaluation_order() {
            if let Some(missing) = def
                .dependencies
                .iter()
                .find(|dep| !values.contains_key(dep.as_str()))
            {
                warn!(metric = %def.id, dependency = %missing, "Skipping metric: dependency unavailable");
                failures.push(ComputationFailure {
                    metric_id: def.id.clone(),
                    reason: format!("dependency '{}' failed", missing),
                });
                continue;
            }

            let outcome = def.evaluate(&MetricContext::new(table, &values));
            match outcome {
                Ok(value) => {
                    debug!(metric = %def.id, value, "Computed");
                    values.insert(def.id.clone(), value);
                }
                Err(e) => {
                    warn!(metric = %def.id, error = %e, "Metric computation failed");
                    failures.push(ComputationFailure {
                        metric_id: def.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            computed = values.len(),
            failed = failures.len(),
            "Snapshot computed in {:.2?}",
            start.elapsed()
        );
        MetricSnapshot::new(period, values, failures)
    }

    /// Computes a single metric, resolving its dependencies recursively.
    pub fn compute_one(&self, id: &str, table: &AggregateTable) -> Result<f64, DomainError> {
        let mut computed = BTreeMap::new();
        let mut path = Vec::new();
        self.resolve(id, table, &mut computed, &mut path)
    }

    fn resolve(
        &self,
        id: &str,
        table: &AggregateTable,
        computed: &mut BTreeMap<String, f64>,
        path: &mut Vec<String>,
    ) -> Result<f64, DomainError> {
        if let Some(value) = computed.get(id) {
            return Ok(*value);
        }
        if path.iter().any(|p| p == id) {
            path.push(id.to_string());
            return Err(DomainError::CircularDependency(path.join(" -> ")));
        }

        let def = self.registry.get(id)?;
        path.push(id.to_string());
        for dep in &def.dependencies {
            self.resolve(dep, table, computed, path)?;
        }
        path.pop();

        let value = def
            .evaluate(&MetricContext::new(table, computed))
            .map_err(|e| DomainError::MetricFailed(id.to_string(), e.to_string()))?;
        computed.insert(id.to_string(), value);
        Ok(value)
    }

    /// Deltas for metrics present in both snapshots, in catalog order.
    /// Metrics present in only one snapshot are left out and listed as unmatched.
    #[instrument(skip_all, fields(period_1 = %s1.period(), period_2 = %s2.period()))]
    pub fn compare_periods(&self, s1: &MetricSnapshot, s2: &MetricSnapshot) -> PeriodComparison {
        let catalog: Vec<&str> = self.registry.iter().map(|d| d.id.as_str()).collect();
        let extras: BTreeSet<&str> = s1
            .values()
            .keys()
            .chain(s2.values().keys())
            .map(String::as_str)
            .filter(|id| !self.registry.contains(id))
            .collect();

        let mut deltas = Vec::new();
        let mut unmatched = Vec::new();

        for id in catalog.into_iter().chain(extras) {
            match (s1.get(id), s2.get(id)) {
                (Some(v1), Some(v2)) => {
                    let absolute_delta = v2 - v1;
                    deltas.push(PeriodDelta {
                        metric_id: id.to_string(),
                        period_1: v1,
                        period_2: v2,
                        absolute_delta,
                        percent_delta: safe_div(absolute_delta, v1),
                    });
                }
                (None, None) => {}
                _ => {
                    warn!(metric = %id, "Metric present in only one period, omitted from comparison");
                    unmatched.push(id.to_string());
                }
            }
        }

        PeriodComparison {
            period_1: s1.period().to_string(),
            period_2: s2.period().to_string(),
            deltas,
            unmatched,
        }
    }

    /// Each North Star with the values of its full dependency chain.
    pub fn get_north_star(
        &self,
        snapshot: &MetricSnapshot,
    ) -> Result<Vec<NorthStarSummary>, DomainError> {
        self.registry
            .by_kind(MetricKind::NorthStar)
            .map(|def| {
                let chain = self.dependency_chain(&def.id);
                let components = self
                    .registry
                    .evaluation_order()
                    .filter(|d| chain.contains(d.id.as_str()))
                    .map(|d| {
                        Ok(ComponentValue {
                            id: d.id.clone(),
                            display_name: d.display_name.clone(),
                            value: snapshot.require(&d.id)?,
                        })
                    })
                    .collect::<Result<Vec<_>, DomainError>>()?;

                Ok(NorthStarSummary {
                    id: def.id.clone(),
                    display_name: def.display_name.clone(),
                    value: snapshot.require(&def.id)?,
                    unit: def.unit.clone(),
                    owner: def.owner.clone(),
                    formula: def.formula.clone(),
                    components,
                })
            })
            .collect()
    }

    /// Transitive dependencies of `id`, excluding `id` itself.
    fn dependency_chain(&self, id: &str) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Ok(def) = self.registry.get(current) else {
                continue;
            };
            for dep in &def.dependencies {
                if seen.insert(dep.as_str()) {
                    stack.push(dep.as_str());
                }
            }
        }
        seen
    }

    /// One row per catalog metric, failed metrics included with status ERROR.
    pub fn tabulate(&self, snapshot: &MetricSnapshot) -> Vec<MetricRecord> {
        self.registry
            .iter()
            .map(|def| {
                let value = snapshot.get(&def.id);
                MetricRecord {
                    id: def.id.clone(),
                    display_name: def.display_name.clone(),
                    kind: def.kind,
                    tier: def.tier,
                    unit: def.unit.clone(),
                    owner: def.owner.clone(),
                    formula: def.formula.clone(),
                    value,
                    status: value.map_or(MetricStatus::Error, |v| def.thresholds.status(v)),
                }
            })
            .collect()
    }

    pub fn layers(&self, snapshot: &MetricSnapshot) -> MetricLayers {
        let (executive, diagnostic) = self
            .tabulate(snapshot)
            .into_iter()
            .partition(|record| record.tier.is_executive());
        MetricLayers {
            executive,
            diagnostic,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::metrics::catalog::{
        ITEMS_PER_ORDER, MEDIAN_DAYS_SINCE_PRIOR, ORDERS_PER_CUSTOMER, VPAC,
    };
    use crate::domain::metrics::{
        Grain, MetricDefinition, MetricError, MetricRegistry, build_registry,
    };
    use crate::domain::table::PerUserAggregate;
    use anyhow::Result;

    fn engine() -> MetricEngine {
        MetricEngine::new(build_registry().unwrap())
    }

    fn user(id: &str, orders: i64, items: i64, days: Option<f64>) -> PerUserAggregate {
        PerUserAggregate {
            median_days_since_prior: days,
            reorder_rate: 0.5,
            small_basket_share: 0.1,
            ..PerUserAggregate::from_counts(id, orders, items)
        }
    }

    fn fails(_: &MetricContext<'_>) -> Result<f64, MetricError> {
        Err(MetricError::Rule("boom".to_string()))
    }

    fn one(_: &MetricContext<'_>) -> Result<f64, MetricError> {
        Ok(1.0)
    }

    fn doubled(ctx: &MetricContext<'_>) -> Result<f64, MetricError> {
        Ok(ctx.dependency("base")? * 2.0)
    }

    #[test]
    fn test_single_user_vpac_is_exact() -> Result<()> {
        let table = AggregateTable::new(vec![user("u1", 5, 20, Some(7.0))]);
        let engine = engine();

        let snapshot = engine.compute_all(&table, "current");
        assert_eq!(snapshot.require(VPAC)?, 20.0);
        assert_eq!(engine.compute_one(VPAC, &table)?, 20.0);
        assert!(!snapshot.is_degraded());
        Ok(())
    }

    #[test]
    fn test_compute_all_covers_catalog() {
        let table = AggregateTable::new(vec![
            user("u1", 1, 3, None),
            user("u2", 3, 12, Some(6.0)),
            user("u3", 8, 16, Some(3.0)),
        ]);
        let engine = engine();
        let snapshot = engine.compute_all(&table, "current");

        assert_eq!(snapshot.values().len(), engine.registry().len());
        assert!(snapshot.values().values().all(|v| v.is_finite()));
        assert_eq!(snapshot.get(MEDIAN_DAYS_SINCE_PRIOR), Some(4.5));
    }

    #[test]
    fn test_empty_table_yields_zeros_not_nan() {
        let snapshot = engine().compute_all(&AggregateTable::default(), "empty");
        assert_eq!(snapshot.get(VPAC), Some(0.0));
        assert!(snapshot.values().values().all(|v| v.is_finite()));
    }

    #[test]
    fn test_failure_is_isolated_and_propagates_to_dependents() -> Result<()> {
        let registry = MetricRegistry::build(vec![
            MetricDefinition::new("broken", "Broken", MetricKind::Diagnostic, fails),
            MetricDefinition::new("base", "Base", MetricKind::Driver, one),
            MetricDefinition::new("derived", "Derived", MetricKind::NorthStar, doubled)
                .depends_on(&["base"]),
            MetricDefinition::new("downstream", "Downstream", MetricKind::Diagnostic, one)
                .depends_on(&["broken"]),
        ])?;
        let engine = MetricEngine::new(registry);
        let snapshot = engine.compute_all(&AggregateTable::default(), "p");

        assert!(snapshot.is_degraded());
        assert_eq!(snapshot.get("derived"), Some(2.0));
        let failed: Vec<_> = snapshot.failures().iter().map(|f| f.metric_id.as_str()).collect();
        assert_eq!(failed, vec!["broken", "downstream"]);
        assert!(matches!(
            engine.compute_one("broken", &AggregateTable::default()),
            Err(DomainError::MetricFailed(id, _)) if id == "broken"
        ));
        Ok(())
    }

    #[test]
    fn test_order_grain_is_recorded_as_failure() -> Result<()> {
        let registry = MetricRegistry::build(vec![
            MetricDefinition::new("per_order", "Per Order", MetricKind::Diagnostic, one)
                .grain(Grain::Order),
        ])?;
        let snapshot = MetricEngine::new(registry).compute_all(&AggregateTable::default(), "p");
        assert!(snapshot.get("per_order").is_none());
        assert!(snapshot.failures()[0].reason.contains("grain"));
        Ok(())
    }

    #[test]
    fn test_compute_one_unknown_metric() {
        assert!(matches!(
            engine().compute_one("gmv", &AggregateTable::default()),
            Err(DomainError::MetricNotFound(_))
        ));
    }

    #[test]
    fn test_compare_periods_omits_unmatched() -> Result<()> {
        let engine = engine();
        let mut v1 = BTreeMap::new();
        v1.insert(VPAC.to_string(), 80.0);
        v1.insert(ORDERS_PER_CUSTOMER.to_string(), 10.0);
        let mut v2 = BTreeMap::new();
        v2.insert(VPAC.to_string(), 160.0);
        v2.insert(ITEMS_PER_ORDER.to_string(), 10.0);

        let comparison = engine.compare_periods(
            &MetricSnapshot::new("baseline", v1, vec![]),
            &MetricSnapshot::new("current", v2, vec![]),
        );

        assert_eq!(comparison.deltas.len(), 1);
        let vpac = &comparison.deltas[0];
        assert_eq!(vpac.absolute_delta, 80.0);
        assert_eq!(vpac.percent_delta, 1.0);
        assert_eq!(comparison.unmatched, vec![ORDERS_PER_CUSTOMER, ITEMS_PER_ORDER]);
        Ok(())
    }

    #[test]
    fn test_percent_delta_from_zero_is_zero() {
        let mut v1 = BTreeMap::new();
        v1.insert(VPAC.to_string(), 0.0);
        let mut v2 = BTreeMap::new();
        v2.insert(VPAC.to_string(), 5.0);
        let comparison = engine().compare_periods(
            &MetricSnapshot::new("a", v1, vec![]),
            &MetricSnapshot::new("b", v2, vec![]),
        );
        assert_eq!(comparison.deltas[0].percent_delta, 0.0);
    }

    #[test]
    fn test_north_star_lists_its_drivers() -> Result<()> {
        let engine = engine();
        let table = AggregateTable::new(vec![user("u1", 2, 8, Some(3.0)), user("u2", 4, 8, Some(5.0))]);
        let snapshot = engine.compute_all(&table, "current");

        let north_stars = engine.get_north_star(&snapshot)?;
        assert_eq!(north_stars.len(), 1);
        let ns = &north_stars[0];
        assert_eq!(ns.id, VPAC);
        let ids: Vec<_> = ns.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![ORDERS_PER_CUSTOMER, ITEMS_PER_ORDER]);
        assert_eq!(ns.value, 3.0 * 3.0);
        Ok(())
    }

    #[test]
    fn test_layers_split_by_tier() {
        let engine = engine();
        let table = AggregateTable::new(vec![user("u1", 2, 8, Some(3.0))]);
        let layers = engine.layers(&engine.compute_all(&table, "current"));

        assert!(layers.executive.iter().all(|r| r.tier.is_executive()));
        assert!(layers.executive.iter().any(|r| r.id == VPAC));
        assert!(layers.diagnostic.iter().any(|r| r.id == MEDIAN_DAYS_SINCE_PRIOR));
        assert_eq!(
            layers.executive.len() + layers.diagnostic.len(),
            engine.registry().len()
        );
    }

    #[test]
    fn test_tabulate_flags_missing_and_breaching_values() {
        let engine = engine();
        let mut values = BTreeMap::new();
        values.insert("small_basket_share".to_string(), 0.45);
        let records = engine.tabulate(&MetricSnapshot::new("p", values, vec![]));

        let small = records.iter().find(|r| r.id == "small_basket_share").unwrap();
        assert_eq!(small.status, MetricStatus::Breach);
        let vpac = records.iter().find(|r| r.id == VPAC).unwrap();
        assert_eq!(vpac.status, MetricStatus::Error);
        assert!(vpac.value.is_none());
    }
}
