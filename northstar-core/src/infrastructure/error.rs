// northstar-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(northstar::infra::database::duckdb),
        help("An error occurred inside the SQL engine while aggregating the input files.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(northstar::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(northstar::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(northstar::infra::config))]
    ConfigError(String),

    #[error("Configuration file not found at '{0}'")]
    #[diagnostic(code(northstar::infra::config_missing))]
    ConfigNotFound(String),

    // --- INPUT CONTRACT ---
    #[error("Input file not found: '{0}'")]
    #[diagnostic(code(northstar::infra::input_missing))]
    InputNotFound(String),

    #[error("Schema mismatch in '{source_name}': {reason}")]
    #[diagnostic(
        code(northstar::infra::schema),
        help(
            "Expected columns: user_id, orders, items, avg_basket_size, reorder_rate, small_basket_share, median_days_since_prior, lifetime_orders"
        )
    )]
    SchemaMismatch { source_name: String, reason: String },

    // --- REPORTING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(northstar::infra::template),
        help("Check the Jinja syntax ({{ ... }}) of the report template.")
    )]
    TemplateError(#[from] minijinja::Error),

    #[error("JSON Serialization Error: {0}")]
    #[diagnostic(code(northstar::infra::json))]
    Json(#[from] serde_json::Error),
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
