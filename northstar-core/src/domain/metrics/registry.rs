// northstar-core/src/domain/metrics/registry.rs

use std::collections::HashMap;
use tracing::debug;

use crate::domain::error::DomainError;
use crate::domain::graph::GraphSolver;
use crate::domain::metrics::catalog;
use crate::domain::metrics::definition::{MetricDefinition, MetricKind, Tier};

/// Single source of truth mapping a metric id to its definition.
/// Validated once at construction; immutable afterwards.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    definitions: Vec<MetricDefinition>,
    index: HashMap<String, usize>,
    evaluation_order: Vec<usize>,
}

impl MetricRegistry {
    /// Fails fast on duplicate ids, unknown dependencies and dependency cycles.
    pub fn build(definitions: Vec<MetricDefinition>) -> Result<Self, DomainError> {
        let evaluation_order = GraphSolver::plan_execution(&definitions)?;

        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();

        debug!(metrics = definitions.len(), "Metric registry built");

        Ok(Self {
            definitions,
            index,
            evaluation_order,
        })
    }

    pub fn get(&self, id: &str) -> Result<&MetricDefinition, DomainError> {
        self.index
            .get(id)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| DomainError::MetricNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.definitions.iter()
    }

    /// Definitions in dependency order (dependencies first, ties by declaration).
    pub fn evaluation_order(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.evaluation_order.iter().map(|&i| &self.definitions[i])
    }

    pub fn by_kind(&self, kind: MetricKind) -> impl Iterator<Item = &MetricDefinition> {
        self.definitions.iter().filter(move |d| d.kind == kind)
    }

    pub fn by_tier(&self, tier: Tier) -> impl Iterator<Item = &MetricDefinition> {
        self.definitions.iter().filter(move |d| d.tier == tier)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Builds the registry of the standard KPI catalog.
pub fn build_registry() -> Result<MetricRegistry, DomainError> {
    MetricRegistry::build(catalog::standard_metrics())
}
