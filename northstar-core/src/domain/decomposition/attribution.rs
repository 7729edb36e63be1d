// northstar-core/src/domain/decomposition/attribution.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::error::DomainError;
use crate::domain::metrics::MetricSnapshot;
use crate::domain::metrics::catalog::{ITEMS_PER_ORDER, ORDERS_PER_CUSTOMER};
use crate::domain::stats::safe_div;

/// Used instead of the relative tolerance when the total change is exactly zero.
pub const ABSOLUTE_EPSILON: f64 = 1e-9;

/// Driver values of one period for `N = A × B`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverPair {
    pub a: f64,
    pub b: f64,
}

impl DriverPair {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn product(&self) -> f64 {
        self.a * self.b
    }

    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub period_1: String,
    pub period_2: String,
    pub driver_a: String,
    pub driver_b: String,
    pub start: DriverPair,
    pub end: DriverPair,
    pub north_star_start: f64,
    pub north_star_end: f64,
    pub total_change: f64,
    /// Fraction of the starting value; 0.0 when the start is zero.
    pub percent_change: f64,
    pub driver_a_contribution: f64,
    pub driver_b_contribution: f64,
    /// Second-order effect of both drivers moving together. Always reported on its own.
    pub interaction: f64,
}

impl DecompositionResult {
    pub fn terms_sum(&self) -> f64 {
        self.driver_a_contribution + self.driver_b_contribution + self.interaction
    }

    /// Share of the total change explained by one term (0.0 when nothing changed).
    pub fn share_of_change(&self, term: f64) -> f64 {
        safe_div(term, self.total_change)
    }
}

/// Midpoint (symmetric) attribution of a two-factor multiplicative metric.
#[derive(Debug, Clone)]
pub struct Decomposer {
    tolerance: f64,
    driver_a: String,
    driver_b: String,
}

impl Decomposer {
    /// VPAC decomposer: A = orders per customer, B = items per order.
    pub fn new(tolerance: f64) -> Self {
        Self::with_drivers(tolerance, ORDERS_PER_CUSTOMER, ITEMS_PER_ORDER)
    }

    pub fn with_drivers(tolerance: f64, driver_a: &str, driver_b: &str) -> Self {
        Self {
            tolerance,
            driver_a: driver_a.to_string(),
            driver_b: driver_b.to_string(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn decompose(
        &self,
        period1: DriverPair,
        period2: DriverPair,
    ) -> Result<DecompositionResult, DomainError> {
        self.decompose_labeled("Period 1", period1, "Period 2", period2)
    }

    pub fn decompose_labeled(
        &self,
        label1: &str,
        period1: DriverPair,
        label2: &str,
        period2: DriverPair,
    ) -> Result<DecompositionResult, DomainError> {
        self.check_driver(label1, &self.driver_a, period1.a)?;
        self.check_driver(label1, &self.driver_b, period1.b)?;
        self.check_driver(label2, &self.driver_a, period2.a)?;
        self.check_driver(label2, &self.driver_b, period2.b)?;

        let delta_a = period2.a - period1.a;
        let delta_b = period2.b - period1.b;

        let driver_a_contribution = delta_a * ((period1.b + period2.b) / 2.0);
        let driver_b_contribution = delta_b * ((period1.a + period2.a) / 2.0);

        let north_star_start = period1.product();
        let north_star_end = period2.product();
        let total_change = north_star_end - north_star_start;
        let interaction = total_change - (driver_a_contribution + driver_b_contribution);

        debug!(
            total_change,
            driver_a_contribution, driver_b_contribution, interaction, "Decomposed change"
        );

        Ok(DecompositionResult {
            period_1: label1.to_string(),
            period_2: label2.to_string(),
            driver_a: self.driver_a.clone(),
            driver_b: self.driver_b.clone(),
            start: period1,
            end: period2,
            north_star_start,
            north_star_end,
            total_change,
            percent_change: safe_div(total_change, north_star_start),
            driver_a_contribution,
            driver_b_contribution,
            interaction,
        })
    }

    /// Decomposes the change from the first to the last snapshot.
    /// Fewer than two snapshots is not decomposable: no synthetic prior period is invented.
    pub fn decompose_periods(
        &self,
        snapshots: &[MetricSnapshot],
    ) -> Result<DecompositionResult, DomainError> {
        let (first, last) = match snapshots {
            [first, .., last] => (first, last),
            _ => {
                return Err(DomainError::InsufficientData(format!(
                    "{} period(s) available, 2 required",
                    snapshots.len()
                )));
            }
        };

        let p1 = DriverPair::new(first.require(&self.driver_a)?, first.require(&self.driver_b)?);
        let p2 = DriverPair::new(last.require(&self.driver_a)?, last.require(&self.driver_b)?);

        self.decompose_labeled(first.period(), p1, last.period(), p2)
    }

    /// True iff the three terms add up to the total change within tolerance.
    pub fn validate(&self, result: &DecompositionResult) -> bool {
        let terms_sum = result.terms_sum();
        if result.total_change == 0.0 {
            return terms_sum.abs() <= ABSOLUTE_EPSILON;
        }
        (terms_sum - result.total_change).abs() <= self.tolerance * result.total_change.abs()
    }

    /// `validate` as an error: a mismatch is an arithmetic bug and must not be ignored.
    pub fn ensure_valid(&self, result: &DecompositionResult) -> Result<(), DomainError> {
        if self.validate(result) {
            return Ok(());
        }
        error!(
            terms_sum = result.terms_sum(),
            total_change = result.total_change,
            "Decomposition validation failed"
        );
        Err(DomainError::DecompositionMismatch {
            terms_sum: result.terms_sum(),
            total_change: result.total_change,
            tolerance: self.tolerance,
        })
    }

    fn check_driver(&self, period: &str, driver: &str, value: f64) -> Result<(), DomainError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(DomainError::InvalidDriver {
                driver: format!("{} ({})", driver, period),
                value,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn snapshot(period: &str, opc: f64, ipo: f64) -> MetricSnapshot {
        let mut values = BTreeMap::new();
        values.insert(ORDERS_PER_CUSTOMER.to_string(), opc);
        values.insert(ITEMS_PER_ORDER.to_string(), ipo);
        MetricSnapshot::new(period, values, vec![])
    }

    #[test]
    fn test_reference_scenario() -> Result<()> {
        let decomposer = Decomposer::new(0.01);
        let result = decomposer.decompose(DriverPair::new(10.0, 8.0), DriverPair::new(16.0, 10.0))?;

        assert_eq!(result.north_star_start, 80.0);
        assert_eq!(result.north_star_end, 160.0);
        assert_eq!(result.total_change, 80.0);
        assert_eq!(result.driver_a_contribution, 54.0);
        assert_eq!(result.driver_b_contribution, 26.0);
        assert_eq!(result.interaction, 0.0);
        assert_eq!(result.percent_change, 1.0);
        assert!(decomposer.validate(&result));
        decomposer.ensure_valid(&result)?;
        Ok(())
    }

    #[test]
    fn test_identical_periods_are_all_zero() -> Result<()> {
        let decomposer = Decomposer::new(0.01);
        let p = DriverPair::new(3.5, 7.25);
        let result = decomposer.decompose(p, p)?;

        assert_eq!(result.total_change, 0.0);
        assert_eq!(result.driver_a_contribution, 0.0);
        assert_eq!(result.driver_b_contribution, 0.0);
        assert_eq!(result.interaction, 0.0);
        assert!(decomposer.validate(&result));
        Ok(())
    }

    #[test]
    fn test_orders_only_change_is_attributed_to_orders() -> Result<()> {
        let result = Decomposer::new(0.01)
            .decompose(DriverPair::new(4.0, 10.0), DriverPair::new(5.0, 10.0))?;
        assert_eq!(result.driver_a_contribution, 10.0);
        assert_eq!(result.driver_b_contribution, 0.0);
        assert!(result.driver_a_contribution.abs() > result.driver_b_contribution.abs());
        Ok(())
    }

    #[test]
    fn test_negative_driver_rejected() {
        let decomposer = Decomposer::new(0.01);
        let result = decomposer.decompose(DriverPair::new(-1.0, 8.0), DriverPair::new(2.0, 8.0));
        assert!(matches!(
            result,
            Err(DomainError::InvalidDriver { value, .. }) if value == -1.0
        ));
    }

    #[test]
    fn test_non_finite_driver_rejected() {
        let decomposer = Decomposer::new(0.01);
        assert!(
            decomposer
                .decompose(DriverPair::new(1.0, f64::NAN), DriverPair::new(2.0, 8.0))
                .is_err()
        );
        assert!(
            decomposer
                .decompose(DriverPair::new(1.0, 2.0), DriverPair::new(f64::INFINITY, 8.0))
                .is_err()
        );
    }

    #[test]
    fn test_validation_fails_on_tampered_result() -> Result<()> {
        let decomposer = Decomposer::new(0.01);
        let mut result =
            decomposer.decompose(DriverPair::new(10.0, 8.0), DriverPair::new(16.0, 10.0))?;
        result.interaction = 5.0;

        assert!(!decomposer.validate(&result));
        assert!(matches!(
            decomposer.ensure_valid(&result),
            Err(DomainError::DecompositionMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_zero_total_uses_absolute_epsilon() -> Result<()> {
        let decomposer = Decomposer::new(0.01);
        // 4 × 5 = 2 × 10: the total is exactly zero but drivers moved
        let mut result =
            decomposer.decompose(DriverPair::new(4.0, 5.0), DriverPair::new(2.0, 10.0))?;
        assert_eq!(result.total_change, 0.0);
        assert!(decomposer.validate(&result));

        result.interaction += 1e-6;
        assert!(!decomposer.validate(&result));
        Ok(())
    }

    #[test]
    fn test_single_period_is_insufficient() {
        let decomposer = Decomposer::new(0.01);
        let only = snapshot("current", 3.0, 9.0);

        assert!(matches!(
            decomposer.decompose_periods(std::slice::from_ref(&only)),
            Err(DomainError::InsufficientData(_))
        ));
        assert!(matches!(
            decomposer.decompose_periods(&[]),
            Err(DomainError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_decompose_periods_reads_driver_values() -> Result<()> {
        let decomposer = Decomposer::new(0.01);
        let result = decomposer.decompose_periods(&[
            snapshot("baseline", 10.0, 8.0),
            snapshot("current", 16.0, 10.0),
        ])?;

        assert_eq!(result.period_1, "baseline");
        assert_eq!(result.period_2, "current");
        assert_eq!(result.total_change, 80.0);
        Ok(())
    }

    #[test]
    fn test_decompose_periods_missing_driver() {
        let decomposer = Decomposer::new(0.01);
        let broken = MetricSnapshot::new("current", BTreeMap::new(), vec![]);
        assert!(matches!(
            decomposer.decompose_periods(&[snapshot("baseline", 1.0, 1.0), broken]),
            Err(DomainError::MetricUnavailable(id, period))
                if id == ORDERS_PER_CUSTOMER && period == "current"
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_identical_periods_yield_zero(a in 0.0f64..1e6, b in 0.0f64..1e6) {
            let p = DriverPair::new(a, b);
            let result = Decomposer::new(0.01).decompose(p, p).unwrap();
            prop_assert_eq!(result.total_change, 0.0);
            prop_assert_eq!(result.driver_a_contribution, 0.0);
            prop_assert_eq!(result.driver_b_contribution, 0.0);
            prop_assert_eq!(result.interaction, 0.0);
        }

        #[test]
        fn prop_terms_sum_to_total(
            a1 in 0.0f64..1e4,
            b1 in 0.0f64..1e4,
            a2 in 0.0f64..1e4,
            b2 in 0.0f64..1e4,
        ) {
            let decomposer = Decomposer::new(0.01);
            let result = decomposer
                .decompose(DriverPair::new(a1, b1), DriverPair::new(a2, b2))
                .unwrap();
            prop_assert!(decomposer.validate(&result));
        }

        #[test]
        fn prop_swapping_factors_swaps_contributions(
            a1 in 0.0f64..1e4,
            b1 in 0.0f64..1e4,
            a2 in 0.0f64..1e4,
            b2 in 0.0f64..1e4,
        ) {
            let decomposer = Decomposer::new(0.01);
            let p1 = DriverPair::new(a1, b1);
            let p2 = DriverPair::new(a2, b2);
            let straight = decomposer.decompose(p1, p2).unwrap();
            let swapped = decomposer.decompose(p1.swapped(), p2.swapped()).unwrap();

            prop_assert!(approx(straight.driver_a_contribution, swapped.driver_b_contribution));
            prop_assert!(approx(straight.driver_b_contribution, swapped.driver_a_contribution));
            prop_assert!(approx(straight.total_change, swapped.total_change));
            prop_assert!(approx(straight.interaction, swapped.interaction));
        }
    }
}
