// northstar-core/src/domain/quality/outliers.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::stats;

/// Below this spread every value is considered equal and nothing is flagged.
const MIN_STD_DEV: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    ZScore { threshold: f64 },
    Iqr { multiplier: f64 },
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::ZScore { threshold } => write!(f, "z-score > {}", threshold),
            OutlierMethod::Iqr { multiplier } => write!(f, "{} x IQR", multiplier),
        }
    }
}

/// Values outside `[lower, upper]` are outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

pub struct OutlierDetector;

impl OutlierDetector {
    /// Acceptance bounds for `values`, or `None` when the sample has no spread.
    pub fn bounds(values: &[f64], method: OutlierMethod) -> Option<OutlierBounds> {
        if values.is_empty() {
            return None;
        }
        match method {
            OutlierMethod::ZScore { threshold } => {
                let mean = stats::mean(values);
                let std_dev = stats::std_dev(values);
                if std_dev <= MIN_STD_DEV {
                    return None;
                }
                Some(OutlierBounds {
                    lower: mean - threshold * std_dev,
                    upper: mean + threshold * std_dev,
                })
            }
            OutlierMethod::Iqr { multiplier } => {
                let q1 = stats::quantile(values, 0.25);
                let q3 = stats::quantile(values, 0.75);
                let iqr = q3 - q1;
                Some(OutlierBounds {
                    lower: q1 - multiplier * iqr,
                    upper: q3 + multiplier * iqr,
                })
            }
        }
    }

    /// Indices of the flagged values, in input order.
    pub fn flag(values: &[f64], method: OutlierMethod) -> Vec<usize> {
        let Some(bounds) = Self::bounds(values, method) else {
            return Vec::new();
        };
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| !bounds.contains(**v))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_flags_spike() {
        let mut values = vec![1.0; 9];
        values.push(50.0);
        // mean 5.9, population std 14.7: the spike sits at z = 3.0
        let flagged = OutlierDetector::flag(&values, OutlierMethod::ZScore { threshold: 2.5 });
        assert_eq!(flagged, vec![9]);

        let strict = OutlierDetector::flag(&values, OutlierMethod::ZScore { threshold: 3.5 });
        assert!(strict.is_empty());
    }

    #[test]
    fn test_zscore_constant_sample_flags_nothing() {
        let values = vec![4.0; 20];
        assert!(OutlierDetector::bounds(&values, OutlierMethod::ZScore { threshold: 2.5 }).is_none());
        assert!(OutlierDetector::flag(&values, OutlierMethod::ZScore { threshold: 0.1 }).is_empty());
    }

    #[test]
    fn test_iqr_flags_far_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 100.0];
        let bounds = OutlierDetector::bounds(&values, OutlierMethod::Iqr { multiplier: 1.5 }).unwrap_or(
            OutlierBounds {
                lower: 0.0,
                upper: 0.0,
            },
        );
        assert_eq!(bounds.lower, -3.0);
        assert_eq!(bounds.upper, 13.0);
        assert_eq!(
            OutlierDetector::flag(&values, OutlierMethod::Iqr { multiplier: 1.5 }),
            vec![8]
        );
    }

    #[test]
    fn test_empty_sample() {
        assert!(OutlierDetector::flag(&[], OutlierMethod::Iqr { multiplier: 1.5 }).is_empty());
    }
}
