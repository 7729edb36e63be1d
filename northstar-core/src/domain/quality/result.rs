// northstar-core/src/domain/quality/result.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::error::DomainError;
use crate::domain::table::Column;

/// ERROR results halt the pipeline; WARNING results are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub check_name: String,
    pub columns: Vec<Column>,
    pub passed: bool,
    /// Severity carried by the check; only relevant when it failed.
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl QualityCheckResult {
    pub fn new(
        check_name: impl Into<String>,
        columns: Vec<Column>,
        passed: bool,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            columns,
            passed,
            severity,
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        !self.passed && self.severity == Severity::Warning
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Ordered results of one `run_all` pass over a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub dataset: String,
    pub results: Vec<QualityCheckResult>,
    pub summary: QualitySummary,
}

impl QualityReport {
    pub fn new(dataset: impl Into<String>, results: Vec<QualityCheckResult>) -> Self {
        let summary = QualitySummary {
            total: results.len(),
            passed: results.iter().filter(|r| r.passed).count(),
            warnings: results.iter().filter(|r| r.is_warning()).count(),
            errors: results.iter().filter(|r| r.is_blocking()).count(),
        };
        Self {
            dataset: dataset.into(),
            results,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &QualityCheckResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Converts blocking failures into the pipeline-halting error.
    pub fn gate(&self) -> Result<(), DomainError> {
        if !self.has_errors() {
            return Ok(());
        }
        let checks = self
            .results
            .iter()
            .filter(|r| r.is_blocking())
            .map(|r| r.check_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(DomainError::QualityGateFailed {
            dataset: self.dataset.clone(),
            errors: self.summary.errors,
            checks,
        })
    }
}
