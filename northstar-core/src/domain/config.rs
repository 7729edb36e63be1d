// northstar-core/src/domain/config.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::table::Column;

/// Execution profile, selected with `NORTHSTAR_ENV`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Dev,
    Ci,
    Prod,
}

impl FromStr for Profile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Profile::Dev),
            "ci" => Ok(Profile::Ci),
            "prod" => Ok(Profile::Prod),
            other => Err(DomainError::Configuration(format!(
                "Unknown profile '{}' (expected dev, ci or prod)",
                other
            ))),
        }
    }
}

/// Detector used by the outlier checks of the quality suite.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutlierStrategy {
    /// `|z| > outlier_z_threshold`
    #[default]
    ZScore,
    /// Outside `[Q1 - k * IQR, Q3 + k * IQR]` with `k = outlier_iqr_multiplier`
    Iqr,
}

/// Row-wise relation between two columns.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
}

impl Relation {
    pub fn holds(&self, a: f64, b: f64) -> bool {
        match self {
            Relation::GreaterOrEqual => a >= b,
            Relation::LessOrEqual => a <= b,
            Relation::Greater => a > b,
            Relation::Less => a < b,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::GreaterOrEqual => ">=",
            Relation::LessOrEqual => "<=",
            Relation::Greater => ">",
            Relation::Less => "<",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonotonicRule {
    pub left: Column,
    pub relation: Relation,
    pub right: Column,
}

/// One frequency band: inclusive bounds, `upper = None` means unbounded.
#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
pub struct BandConfig {
    #[validate(length(min = 1, message = "Band label cannot be empty"))]
    pub label: String,
    pub lower: u32,
    #[serde(default)]
    pub upper: Option<u32>,
}

impl BandConfig {
    pub fn new(label: &str, lower: u32, upper: Option<u32>) -> Self {
        Self {
            label: label.to_string(),
            lower,
            upper,
        }
    }

    pub fn contains(&self, orders: i64) -> bool {
        orders >= i64::from(self.lower) && self.upper.is_none_or(|u| orders <= i64::from(u))
    }

    /// `[2, 4]` or `[11, +inf)`.
    pub fn range_label(&self) -> String {
        match self.upper {
            Some(upper) => format!("[{}, {}]", self.lower, upper),
            None => format!("[{}, +inf)", self.lower),
        }
    }
}

/// Every tunable of the analysis, passed explicitly to each component.
#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    #[validate(range(min = 1, message = "small_basket_threshold must be >= 1"))]
    pub small_basket_threshold: u32,

    #[validate(range(min = 0.0, message = "outlier_z_threshold must be positive"))]
    pub outlier_z_threshold: f64,

    #[validate(range(min = 0.0, message = "outlier_iqr_multiplier must be positive"))]
    pub outlier_iqr_multiplier: f64,

    pub outlier_method: OutlierStrategy,

    #[validate(range(min = 0.0, max = 1.0, message = "decomposition_tolerance must be in [0, 1]"))]
    pub decomposition_tolerance: f64,

    #[validate(range(min = 0.0, max = 1.0, message = "max_null_rate must be in [0, 1]"))]
    pub max_null_rate: f64,

    pub min_sample_size: usize,

    #[validate(nested)]
    #[validate(length(min = 1, message = "At least one segmentation band is required"))]
    pub segmentation_bands: Vec<BandConfig>,

    pub monotonic_relationships: Vec<MonotonicRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            small_basket_threshold: 3,
            outlier_z_threshold: 2.5,
            outlier_iqr_multiplier: 1.5,
            outlier_method: OutlierStrategy::ZScore,
            decomposition_tolerance: 0.01,
            max_null_rate: 0.05,
            min_sample_size: 100,
            segmentation_bands: default_bands(),
            monotonic_relationships: vec![
                MonotonicRule {
                    left: Column::Items,
                    relation: Relation::GreaterOrEqual,
                    right: Column::Orders,
                },
                MonotonicRule {
                    left: Column::LifetimeOrders,
                    relation: Relation::GreaterOrEqual,
                    right: Column::Orders,
                },
            ],
        }
    }
}

impl AnalysisConfig {
    /// Applies profile overrides (CI runs on samples, PROD is stricter).
    pub fn with_profile(mut self, profile: Profile) -> Self {
        match profile {
            Profile::Dev => {}
            Profile::Ci => {
                self.min_sample_size = 50;
            }
            Profile::Prod => {
                self.max_null_rate = 0.02;
                self.decomposition_tolerance = 0.005;
            }
        }
        self
    }
}

pub fn default_bands() -> Vec<BandConfig> {
    vec![
        BandConfig::new("One-time", 1, Some(1)),
        BandConfig::new("Occasional", 2, Some(4)),
        BandConfig::new("Regular", 5, Some(10)),
        BandConfig::new("Power User", 11, None),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.small_basket_threshold, 3);
        assert_eq!(config.outlier_z_threshold, 2.5);
        assert_eq!(config.decomposition_tolerance, 0.01);
        assert_eq!(config.max_null_rate, 0.05);
    }

    #[test]
    fn test_profile_overrides() {
        let prod = AnalysisConfig::default().with_profile(Profile::Prod);
        assert_eq!(prod.max_null_rate, 0.02);
        assert_eq!(prod.decomposition_tolerance, 0.005);

        let ci = AnalysisConfig::default().with_profile(Profile::Ci);
        assert_eq!(ci.min_sample_size, 50);
        assert_eq!(ci.max_null_rate, 0.05);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let config = AnalysisConfig {
            decomposition_tolerance: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_band_label_rejected() {
        let config = AnalysisConfig {
            segmentation_bands: vec![BandConfig::new("", 1, None)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
small_basket_threshold: 5
monotonic_relationships:
  - { left: items, relation: ">=", right: orders }
"#;
        let config: AnalysisConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.small_basket_threshold, 5);
        assert_eq!(config.outlier_z_threshold, 2.5);
        assert_eq!(config.outlier_method, OutlierStrategy::ZScore);
        assert_eq!(config.monotonic_relationships.len(), 1);
        assert_eq!(
            config.monotonic_relationships[0].relation,
            Relation::GreaterOrEqual
        );
    }

    #[test]
    fn test_yaml_selects_iqr_outliers() {
        let yaml = "outlier_method: iqr\noutlier_iqr_multiplier: 3.0\n";
        let config: AnalysisConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.outlier_method, OutlierStrategy::Iqr);
        assert_eq!(config.outlier_iqr_multiplier, 3.0);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("PROD".parse::<Profile>().unwrap(), Profile::Prod);
        assert!("staging".parse::<Profile>().is_err());
    }
}
