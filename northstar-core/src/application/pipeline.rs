// northstar-core/src/application/pipeline.rs

use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument, warn};

// Application Services
use crate::application::engine::MetricEngine;
use crate::application::ports::ReportRenderer;
use crate::application::report::{ComparisonBasis, DecompositionSection, RunReport, key_insights};
use crate::application::segmentation::{segment, segment_by_basket_size};

// Domain
use crate::domain::config::{AnalysisConfig, Profile};
use crate::domain::decomposition::{Decomposer, attribution_view};
use crate::domain::metrics::{MetricSnapshot, build_registry};
use crate::domain::quality::{QualityChecker, QualityReport};
use crate::domain::segmentation::SegmentationBands;
use crate::domain::stats::median;
use crate::domain::table::{AggregateTable, Column};

// Infrastructure
use crate::infrastructure::fs::ArtifactDir;

// Ports
use crate::error::NorthstarError;
use crate::ports::AggregateSource;

pub const RUN_REPORT_FILE: &str = "run_report.json";
pub const QUALITY_REPORT_FILE: &str = "quality_report.json";
pub const BASELINE_QUALITY_REPORT_FILE: &str = "baseline_quality_report.json";

pub const LOW_FREQUENCY_COHORT: &str = "Low-Frequency Users";
pub const HIGH_FREQUENCY_COHORT: &str = "High-Frequency Users";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Label of the current table.
    pub period: String,
    /// Label of the baseline table, when one is given.
    pub baseline_period: String,
    pub profile: Profile,
    pub target_dir: PathBuf,
}

impl RunOptions {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            period: "current".to_string(),
            baseline_period: "baseline".to_string(),
            profile: Profile::default(),
            target_dir: target_dir.into(),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub artifacts: Vec<PathBuf>,
}

/// Runs the full analysis: quality gate, metrics, segments, decomposition, report.
///
/// A blocking quality failure on either table stops the run before any metric is
/// computed; the quality report is still written so the failure can be inspected.
/// Without a baseline, the decomposition compares low- and high-frequency customers
/// of the current table instead of two periods.
#[instrument(skip_all, fields(source = %current.describe(), baseline = baseline.is_some()))]
pub fn run_pipeline<R: ReportRenderer>(
    current: &dyn AggregateSource,
    baseline: Option<&dyn AggregateSource>,
    renderer: &R,
    config: &AnalysisConfig,
    options: &RunOptions,
) -> Result<RunOutcome, NorthstarError> {
    println!("🚀 Starting North Star pipeline...");
    let start_time = Instant::now();

    // 1. SETUP (catalog + config are validated before touching any data)
    let stages = Stages {
        engine: MetricEngine::new(build_registry()?),
        bands: SegmentationBands::new(config.segmentation_bands.clone())?,
        checker: QualityChecker::new(config),
        decomposer: Decomposer::new(config.decomposition_tolerance),
    };
    let artifacts = ArtifactDir::create(&options.target_dir)?;
    let mut written = Vec::new();

    // 2. LOAD + QUALITY GATE
    println!("📥 Loading {}", current.describe());
    let table = current.load()?;
    let quality = stages.checker.run_all(&table, &current.describe());
    written.push(artifacts.write_json(QUALITY_REPORT_FILE, &quality)?);
    print_quality(&quality);
    quality.gate()?;

    // 3. METRICS
    println!("📐 Computing metrics for '{}'...", options.period);
    let snapshot = stages.engine.compute_all(&table, &options.period);
    let north_star = stages.engine.get_north_star(&snapshot)?;
    let layers = stages.engine.layers(&snapshot);

    // 4. SEGMENTS
    println!("👥 Segmenting {} customers...", table.len());
    let segments = segment(&table, &stages.bands, &stages.engine)?;
    let basket_segments = segment_by_basket_size(&table, &stages.engine)?;

    // 5. DECOMPOSITION
    let decomposition = match baseline {
        Some(source) => {
            println!("🔀 Decomposing against {}", source.describe());
            let section = stages.compare_with_baseline(
                source,
                &snapshot,
                &options.baseline_period,
                &artifacts,
                &mut written,
            )?;
            Some(section)
        }
        None => {
            println!("🔀 No baseline given, comparing frequency cohorts");
            stages.compare_frequency_cohorts(&table)?
        }
    };

    // 6. REPORT
    let insights = key_insights(&layers, &segments, decomposition.as_ref());
    let report = RunReport {
        generated_at: Utc::now(),
        source: current.describe(),
        period: options.period.clone(),
        profile: options.profile,
        north_star,
        layers,
        failures: snapshot.failures().to_vec(),
        segments,
        basket_segments,
        quality,
        decomposition,
        insights,
    };

    written.push(artifacts.write_json(RUN_REPORT_FILE, &report)?);
    let rendered = renderer.render(&report)?;
    written.push(artifacts.write_text(renderer.file_name(), &rendered)?);

    if report.is_degraded() {
        warn!(
            failures = report.failures.len(),
            "Run completed with failed metrics"
        );
    }
    info!(artifacts = written.len(), "Artifacts written to {:?}", artifacts.path());
    println!("🏁 Pipeline finished in {:.2?}", start_time.elapsed());

    Ok(RunOutcome {
        report,
        artifacts: written,
    })
}

struct Stages {
    engine: MetricEngine,
    bands: SegmentationBands,
    checker: QualityChecker,
    decomposer: Decomposer,
}

impl Stages {
    fn compare_with_baseline(
        &self,
        source: &dyn AggregateSource,
        current: &MetricSnapshot,
        label: &str,
        artifacts: &ArtifactDir,
        written: &mut Vec<PathBuf>,
    ) -> Result<DecompositionSection, NorthstarError> {
        let table = source.load()?;
        let quality = self.checker.run_all(&table, &source.describe());
        written.push(artifacts.write_json(BASELINE_QUALITY_REPORT_FILE, &quality)?);
        print_quality(&quality);
        quality.gate()?;

        let previous = self.engine.compute_all(&table, label);
        let comparison = self.engine.compare_periods(&previous, current);
        let result = self
            .decomposer
            .decompose_periods(&[previous, current.clone()])?;
        self.decomposer.ensure_valid(&result)?;

        let section = DecompositionSection {
            basis: ComparisonBasis::Periods,
            waterfall: attribution_view(&result),
            result,
            comparison: Some(comparison),
            baseline_quality: Some(quality),
        };
        Ok(section)
    }

    /// Splits customers at the median order count: `<= median` against `> median`.
    fn compare_frequency_cohorts(
        &self,
        table: &AggregateTable,
    ) -> Result<Option<DecompositionSection>, NorthstarError> {
        let cut = median(&table.present_values(Column::Orders));
        let low = table.filter(|r| (r.orders as f64) <= cut);
        let high = table.filter(|r| (r.orders as f64) > cut);

        if low.is_empty() || high.is_empty() {
            warn!(
                median = cut,
                "Order counts do not split into two cohorts, skipping decomposition"
            );
            return Ok(None);
        }

        let snapshots = [
            self.engine.compute_all(&low, LOW_FREQUENCY_COHORT),
            self.engine.compute_all(&high, HIGH_FREQUENCY_COHORT),
        ];
        let result = self.decomposer.decompose_periods(&snapshots)?;
        self.decomposer.ensure_valid(&result)?;

        Ok(Some(DecompositionSection {
            basis: ComparisonBasis::FrequencyCohorts,
            waterfall: attribution_view(&result),
            result,
            comparison: None,
            baseline_quality: None,
        }))
    }
}

fn print_quality(report: &QualityReport) {
    let s = &report.summary;
    if report.has_errors() {
        println!(
            "❌ Quality gate on {}: {} error(s), {} warning(s)",
            report.dataset, s.errors, s.warnings
        );
    } else {
        println!(
            "✅ Quality gate on {}: {}/{} passed, {} warning(s)",
            report.dataset, s.passed, s.total, s.warnings
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::config::BandConfig;
    use crate::domain::error::DomainError;
    use crate::domain::table::PerUserAggregate;
    use anyhow::Result;
    use std::cell::Cell;
    use tempfile::tempdir;

    struct StaticSource {
        name: &'static str,
        table: AggregateTable,
        loads: Cell<usize>,
    }

    impl StaticSource {
        fn new(name: &'static str, rows: Vec<PerUserAggregate>) -> Self {
            Self {
                name,
                table: AggregateTable::new(rows),
                loads: Cell::new(0),
            }
        }
    }

    impl AggregateSource for StaticSource {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        fn load(&self) -> Result<AggregateTable, NorthstarError> {
            self.loads.set(self.loads.get() + 1);
            Ok(self.table.clone())
        }
    }

    struct TitleRenderer;

    impl ReportRenderer for TitleRenderer {
        fn file_name(&self) -> &str {
            "review.txt"
        }

        fn render(&self, report: &RunReport) -> Result<String, NorthstarError> {
            Ok(format!("review of {}", report.source))
        }
    }

    /// Orders 1..=12 repeated, two items per order.
    fn customers(count: usize, items_per_order: i64) -> Vec<PerUserAggregate> {
        (0..count)
            .map(|i| {
                let orders = (i % 12) as i64 + 1;
                PerUserAggregate::from_counts(format!("u{}", i), orders, orders * items_per_order)
            })
            .collect()
    }

    #[test]
    fn test_run_without_baseline_compares_cohorts() -> Result<()> {
        let dir = tempdir()?;
        let source = StaticSource::new("current.csv", customers(120, 2));
        let options = RunOptions::new(dir.path().join("target"));

        let outcome = run_pipeline(
            &source,
            None,
            &TitleRenderer,
            &AnalysisConfig::default(),
            &options,
        )?;
        let report = &outcome.report;

        assert_eq!(report.north_star[0].id, "vpac");
        assert!((report.north_star[0].value - 13.0).abs() < 1e-9);
        assert_eq!(report.segments.len(), 4);
        assert_eq!(report.basket_segments.len(), 4);
        assert!(!report.quality.has_errors());

        let section = report.decomposition.as_ref().unwrap();
        assert_eq!(section.basis, ComparisonBasis::FrequencyCohorts);
        assert_eq!(section.result.period_1, LOW_FREQUENCY_COHORT);
        assert_eq!(section.result.period_2, HIGH_FREQUENCY_COHORT);
        // Basket size is flat, so frequency explains the whole gap
        assert!(section.result.driver_b_contribution.abs() < 1e-9);
        assert!(section.comparison.is_none());

        let names: Vec<_> = outcome
            .artifacts
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec![QUALITY_REPORT_FILE, RUN_REPORT_FILE, "review.txt"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("target").join("review.txt"))?,
            "review of current.csv"
        );
        Ok(())
    }

    #[test]
    fn test_run_with_baseline_decomposes_periods() -> Result<()> {
        let dir = tempdir()?;
        let baseline = StaticSource::new("q1.csv", customers(120, 2));
        let current = StaticSource::new("q2.csv", customers(120, 3));
        let mut options = RunOptions::new(dir.path());
        options.period = "Q2".to_string();
        options.baseline_period = "Q1".to_string();

        let outcome = run_pipeline(
            &current,
            Some(&baseline),
            &TitleRenderer,
            &AnalysisConfig::default(),
            &options,
        )?;

        let section = outcome.report.decomposition.unwrap();
        assert_eq!(section.basis, ComparisonBasis::Periods);
        assert_eq!(section.result.period_1, "Q1");
        assert_eq!(section.result.period_2, "Q2");
        // Same customers, bigger baskets: all of the change is basket size
        assert!(section.result.driver_a_contribution.abs() < 1e-9);
        assert!((section.result.total_change - 6.5).abs() < 1e-9);
        assert!(section.comparison.unwrap().unmatched.is_empty());
        assert!(section.baseline_quality.is_some());
        assert!(dir.path().join(BASELINE_QUALITY_REPORT_FILE).exists());
        Ok(())
    }

    #[test]
    fn test_quality_error_halts_before_reporting() -> Result<()> {
        let dir = tempdir()?;
        let source = StaticSource::new("empty.csv", vec![]);

        let result = run_pipeline(
            &source,
            None,
            &TitleRenderer,
            &AnalysisConfig::default(),
            &RunOptions::new(dir.path()),
        );

        assert!(matches!(
            result,
            Err(NorthstarError::Domain(DomainError::QualityGateFailed { .. }))
        ));
        assert!(dir.path().join(QUALITY_REPORT_FILE).exists());
        assert!(!dir.path().join(RUN_REPORT_FILE).exists());
        Ok(())
    }

    #[test]
    fn test_baseline_quality_error_halts() -> Result<()> {
        let dir = tempdir()?;
        let mut broken = customers(120, 2);
        broken[0].reorder_rate = 1.5;
        let baseline = StaticSource::new("broken.csv", broken);
        let current = StaticSource::new("current.csv", customers(120, 2));

        let result = run_pipeline(
            &current,
            Some(&baseline),
            &TitleRenderer,
            &AnalysisConfig::default(),
            &RunOptions::new(dir.path()),
        );

        assert!(matches!(
            result,
            Err(NorthstarError::Domain(DomainError::QualityGateFailed { ref dataset, .. })) if dataset == "broken.csv"
        ));
        assert!(dir.path().join(QUALITY_REPORT_FILE).exists());
        assert!(!dir.path().join(RUN_REPORT_FILE).exists());

        let content = std::fs::read_to_string(dir.path().join(BASELINE_QUALITY_REPORT_FILE))?;
        let saved: QualityReport = serde_json::from_str(&content)?;
        assert_eq!(saved.dataset, "broken.csv");
        assert!(
            saved
                .failures()
                .any(|r| r.check_name == "range_reorder_rate")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_bands_fail_before_loading() -> Result<()> {
        let dir = tempdir()?;
        let source = StaticSource::new("current.csv", customers(12, 2));
        let config = AnalysisConfig {
            segmentation_bands: vec![
                BandConfig::new("Low", 1, Some(2)),
                BandConfig::new("High", 4, None),
            ],
            ..AnalysisConfig::default()
        };

        let err = run_pipeline(
            &source,
            None,
            &TitleRenderer,
            &config,
            &RunOptions::new(dir.path()),
        )
        .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(source.loads.get(), 0);
        Ok(())
    }

    #[test]
    fn test_uniform_orders_skip_cohort_decomposition() -> Result<()> {
        let dir = tempdir()?;
        let rows = (0..10)
            .map(|i| PerUserAggregate::from_counts(format!("u{}", i), 2, 4))
            .collect();
        let source = StaticSource::new("flat.csv", rows);

        let outcome = run_pipeline(
            &source,
            None,
            &TitleRenderer,
            &AnalysisConfig::default(),
            &RunOptions::new(dir.path()),
        )?;

        assert!(outcome.report.decomposition.is_none());
        Ok(())
    }
}
