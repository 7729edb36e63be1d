// northstar-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum NorthstarError {
    // --- DOMAIN (registry, decomposition, quality gate) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (IO, DuckDB, YAML, templates) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl NorthstarError {
    /// True for failures of the configuration or metric catalog.
    pub fn is_configuration(&self) -> bool {
        match self {
            NorthstarError::Domain(e) => e.is_configuration(),
            NorthstarError::Infrastructure(e) => matches!(
                e,
                InfrastructureError::ConfigError(_)
                    | InfrastructureError::ConfigNotFound(_)
                    | InfrastructureError::YamlError(_)
            ),
        }
    }
}

impl From<std::io::Error> for NorthstarError {
    fn from(err: std::io::Error) -> Self {
        NorthstarError::Infrastructure(InfrastructureError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_diagnostic_code_passes_through() {
        let err = NorthstarError::from(DomainError::InsufficientData("1 period".into()));
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("northstar::domain::insufficient_data"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        let err = NorthstarError::from(InfrastructureError::ConfigNotFound("x.yaml".into()));
        assert!(err.is_configuration());
        let err = NorthstarError::from(DomainError::CircularDependency("a -> b -> a".into()));
        assert!(err.is_configuration());
    }
}
