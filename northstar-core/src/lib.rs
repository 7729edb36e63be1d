// northstar-core/src/lib.rs

// 1. Memory safety
#![deny(unsafe_code)]
// 2. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 3. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: what the pipeline needs from an input (AggregateSource)
pub mod ports;

// 2. Domain: table, metrics, decomposition, segmentation, quality.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: DuckDB source, YAML config, Markdown report, artifact files
pub mod infrastructure;

// 4. Application: metric engine, segmentation use cases, pipeline
pub mod application;

// --- ERRORS ---
pub mod error;

pub use error::NorthstarError;
