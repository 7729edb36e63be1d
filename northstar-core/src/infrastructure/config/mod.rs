// northstar-core/src/infrastructure/config/mod.rs

pub mod analysis;

pub use analysis::{load_analysis_config, parse_profile};
