// northstar-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(northstar::domain::configuration),
        help("Fix the metric catalog or northstar.yaml before running the pipeline.")
    )]
    Configuration(String),

    #[error("Circular dependency detected involving: {0}")]
    #[diagnostic(
        code(northstar::domain::cycle),
        help("Check the `dependencies` lists of the metrics involved.")
    )]
    CircularDependency(String),

    #[error("Metric '{0}' not found in registry")]
    #[diagnostic(code(northstar::domain::metric_not_found))]
    MetricNotFound(String),

    #[error("Metric '{0}' has no value in snapshot '{1}'")]
    #[diagnostic(
        code(northstar::domain::metric_unavailable),
        help("The metric failed during computation; see the snapshot failures.")
    )]
    MetricUnavailable(String, String),

    #[error("Metric '{0}' could not be computed: {1}")]
    #[diagnostic(code(northstar::domain::metric_failed))]
    MetricFailed(String, String),

    #[error("Invalid driver value for {driver}: {value} (drivers must be finite and >= 0)")]
    #[diagnostic(code(northstar::domain::invalid_driver))]
    InvalidDriver { driver: String, value: f64 },

    #[error("Invalid input: {0}")]
    #[diagnostic(code(northstar::domain::invalid_input))]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    #[diagnostic(
        code(northstar::domain::insufficient_data),
        help("Decomposition needs two periods. Provide a baseline table.")
    )]
    InsufficientData(String),

    #[error(
        "Decomposition mismatch: terms sum to {terms_sum:.6} but total change is {total_change:.6} (tolerance {tolerance})"
    )]
    #[diagnostic(
        code(northstar::domain::decomposition),
        help("The attribution terms must add up to the total change. This is an arithmetic bug.")
    )]
    DecompositionMismatch {
        terms_sum: f64,
        total_change: f64,
        tolerance: f64,
    },

    #[error("Quality gate failed on '{dataset}': {errors} blocking check(s): {checks}")]
    #[diagnostic(
        code(northstar::domain::quality_gate),
        help("Fix the aggregate table upstream; reporting is skipped while ERROR checks fail.")
    )]
    QualityGateFailed {
        dataset: String,
        errors: usize,
        checks: String,
    },
}

impl DomainError {
    /// Registry and configuration problems, as opposed to data or arithmetic failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::Configuration(_) | DomainError::CircularDependency(_)
        )
    }
}
