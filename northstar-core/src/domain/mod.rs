// northstar-core/src/domain/mod.rs

pub mod config;
pub mod decomposition;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod quality;
pub mod segmentation;
pub mod stats;
pub mod table;

pub use error::DomainError;
