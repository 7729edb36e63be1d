// northstar-core/src/infrastructure/config/analysis.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::config::{AnalysisConfig, Profile};
use crate::infrastructure::error::InfrastructureError;

const CANDIDATES: [&str; 2] = ["northstar.yaml", "northstar.yml"];

/// Loads the analysis configuration.
///
/// An explicit path must exist. Otherwise `northstar.yaml` (or `.yml`) is looked up in
/// `project_dir`, and defaults apply when there is none. Missing keys take their defaults.
/// The profile is applied before validation.
#[instrument(skip(project_dir, explicit))]
pub fn load_analysis_config(
    project_dir: &Path,
    explicit: Option<&Path>,
    profile: Profile,
) -> Result<AnalysisConfig, InfrastructureError> {
    let base = match find_config(project_dir, explicit)? {
        Some(path) => {
            info!(path = ?path, "Loading analysis configuration");
            let content = fs::read_to_string(&path)?;
            // An empty file parses as null; treat it as "all defaults".
            if content.trim().is_empty() {
                AnalysisConfig::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        }
        None => {
            info!("No northstar.yaml found, using defaults");
            AnalysisConfig::default()
        }
    };

    let config = base.with_profile(profile);
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;
    Ok(config)
}

pub fn parse_profile(value: &str) -> Result<Profile, InfrastructureError> {
    value
        .trim()
        .parse()
        .map_err(|e: crate::domain::error::DomainError| {
            InfrastructureError::ConfigError(e.to_string())
        })
}

fn find_config(
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<Option<PathBuf>, InfrastructureError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(Some(path.to_path_buf()))
        } else {
            Err(InfrastructureError::ConfigNotFound(
                path.display().to_string(),
            ))
        };
    }
    Ok(CANDIDATES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file()))
}
