// northstar-core/src/domain/quality/mod.rs

pub mod checks;
pub mod outliers;
pub mod result;

pub use checks::QualityChecker;
pub use outliers::{OutlierBounds, OutlierDetector, OutlierMethod};
pub use result::{QualityCheckResult, QualityReport, QualitySummary, Severity};
