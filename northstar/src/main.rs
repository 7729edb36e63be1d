// northstar/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

use northstar_core::NorthstarError;
use northstar_core::domain::DomainError;
use northstar_core::infrastructure::error::InfrastructureError;

use cli::{Cli, Commands};
use commands::decompose::DecomposeArgs;
use commands::run::RunArgs;

fn main() {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug northstar run ... to see the details. Logs go to stderr, reports to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = dispatch(cli.command) {
        report_error(&err);
        // Exit with error code for CI/CD
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            input,
            baseline,
            period,
            baseline_period,
            target,
            template,
            config,
        } => commands::run::execute(RunArgs {
            input,
            baseline,
            period,
            baseline_period,
            target,
            template,
            config,
        }),
        Commands::Quality {
            input,
            json,
            config,
        } => commands::quality::execute(input, json, config),
        Commands::Segments { input, by, config } => {
            commands::segments::execute(input, by, config)
        }
        Commands::Decompose {
            from,
            to,
            from_label,
            to_label,
            config,
        } => commands::decompose::execute(DecomposeArgs {
            from,
            to,
            from_label,
            to_label,
            config,
        }),
        Commands::Metrics => commands::metrics::execute(),
    }
}

fn report_error(err: &anyhow::Error) {
    eprintln!("\n💥 {:#}", err);
    if let Some(diagnostic) = diagnostic(err) {
        if let Some(code) = diagnostic.code() {
            eprintln!("   code: {}", code);
        }
        if let Some(help) = diagnostic.help() {
            eprintln!("   👉 {}", help);
        }
    }
}

fn diagnostic(err: &anyhow::Error) -> Option<&dyn Diagnostic> {
    if let Some(e) = err.downcast_ref::<NorthstarError>() {
        return Some(e);
    }
    if let Some(e) = err.downcast_ref::<InfrastructureError>() {
        return Some(e);
    }
    err.downcast_ref::<DomainError>()
        .map(|e| e as &dyn Diagnostic)
}
