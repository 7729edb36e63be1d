// northstar/src/commands/quality.rs
//
// USE CASE: Run the data quality checks without computing metrics.

use comfy_table::{Cell, Color};

use northstar_core::domain::quality::{QualityChecker, QualityReport, Severity};
use northstar_core::ports::AggregateSource;

use crate::cli::{ConfigArgs, InputArgs};
use crate::commands::{load_config, new_table, open_source};

pub fn execute(input: InputArgs, json: bool, config: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let source = open_source(&input, &config)?;
    let table = source.load()?;

    let report = QualityChecker::new(&config).run_all(&table, &source.describe());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    // ERROR checks fail the command; warnings do not
    report.gate()?;
    Ok(())
}

fn print_report(report: &QualityReport) {
    println!("\n🛡️  Quality checks on {}", report.dataset);

    let mut table = new_table(vec!["Check", "Severity", "Status", "Message"]);
    for result in &report.results {
        let status = if result.passed {
            Cell::new("PASS").fg(Color::Green)
        } else if result.severity == Severity::Error {
            Cell::new("FAIL").fg(Color::Red)
        } else {
            Cell::new("WARN").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&result.check_name),
            Cell::new(result.severity),
            status,
            Cell::new(&result.message),
        ]);
    }
    println!("{table}");

    let s = &report.summary;
    println!(
        "   {}/{} passed, {} warning(s), {} error(s)",
        s.passed, s.total, s.warnings, s.errors
    );
}
