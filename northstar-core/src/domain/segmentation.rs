// northstar-core/src/domain/segmentation.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::config::{BandConfig, default_bands};
use crate::domain::error::DomainError;

/// Validated order-frequency bands: contiguous from 1, no gaps, no overlaps,
/// exactly one unbounded band and it comes last.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationBands {
    bands: Vec<BandConfig>,
}

impl SegmentationBands {
    pub fn new(bands: Vec<BandConfig>) -> Result<Self, DomainError> {
        let Some(first) = bands.first() else {
            return Err(DomainError::Configuration(
                "At least one segmentation band is required".to_string(),
            ));
        };
        if first.lower != 1 {
            return Err(DomainError::Configuration(format!(
                "First band '{}' must start at 1, found {}",
                first.label, first.lower
            )));
        }

        let mut labels = HashSet::new();
        for band in &bands {
            if !labels.insert(band.label.as_str()) {
                return Err(DomainError::Configuration(format!(
                    "Duplicate band label '{}'",
                    band.label
                )));
            }
            if let Some(upper) = band.upper
                && upper < band.lower
            {
                return Err(DomainError::Configuration(format!(
                    "Band '{}' is inverted: {} > {}",
                    band.label, band.lower, upper
                )));
            }
        }

        for pair in bands.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let Some(prev_upper) = prev.upper else {
                return Err(DomainError::Configuration(format!(
                    "Unbounded band '{}' must be the last one",
                    prev.label
                )));
            };
            let expected = u64::from(prev_upper) + 1;
            let found = u64::from(next.lower);
            if found > expected {
                return Err(DomainError::Configuration(format!(
                    "Gap between bands '{}' and '{}': {} to {} is not covered",
                    prev.label,
                    next.label,
                    expected,
                    found - 1
                )));
            }
            if found < expected {
                return Err(DomainError::Configuration(format!(
                    "Bands '{}' and '{}' overlap",
                    prev.label, next.label
                )));
            }
        }

        if let Some(last) = bands.last()
            && last.upper.is_some()
        {
            return Err(DomainError::Configuration(format!(
                "Last band '{}' must be unbounded",
                last.label
            )));
        }

        Ok(Self { bands })
    }

    /// One-time [1,1], Occasional [2,4], Regular [5,10], Power User [11,+inf).
    pub fn standard() -> Self {
        Self {
            bands: default_bands(),
        }
    }

    pub fn bands(&self) -> &[BandConfig] {
        &self.bands
    }

    /// The band of a customer with `orders` orders. `None` below 1.
    pub fn assign(&self, orders: i64) -> Option<&BandConfig> {
        self.bands.iter().find(|b| b.contains(orders))
    }
}

/// Per-segment aggregates. Shares are fractions of the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: String,
    pub range: String,
    pub customers: usize,
    pub orders: i64,
    pub items: i64,
    pub customer_share: f64,
    pub order_share: f64,
    pub item_share: f64,
    pub orders_per_customer: f64,
    pub items_per_order: f64,
    pub vpac: f64,
}
