// northstar-core/src/domain/decomposition/mod.rs

pub mod attribution;
pub mod waterfall;

pub use attribution::{ABSOLUTE_EPSILON, Decomposer, DecompositionResult, DriverPair};
pub use waterfall::{StepKind, WaterfallStep, attribution_view};
