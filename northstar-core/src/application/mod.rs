// northstar-core/src/application/mod.rs

pub mod engine;
pub mod ports;
pub mod report;
pub mod segmentation;

pub mod pipeline;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use northstar_core::application::{run_pipeline, MetricEngine};`

pub use engine::{MetricEngine, MetricLayers};
pub use pipeline::{RunOptions, RunOutcome, run_pipeline};
pub use report::{ComparisonBasis, DecompositionSection, RunReport};
pub use segmentation::{segment, segment_by_basket_size};
