// northstar-core/src/domain/metrics/mod.rs

pub mod catalog;
pub mod definition;
pub mod registry;
pub mod snapshot;

pub use definition::{
    ComputeFn, Directionality, Grain, MetricContext, MetricDefinition, MetricError, MetricKind,
    MetricStatus, Thresholds, Tier,
};
pub use registry::{MetricRegistry, build_registry};
pub use snapshot::{
    ComponentValue, ComputationFailure, MetricRecord, MetricSnapshot, NorthStarSummary,
    PeriodComparison, PeriodDelta,
};
