// northstar-core/src/ports/source.rs

// What the pipeline needs from an input, without knowing where the rows come from.

use crate::domain::table::AggregateTable;
use crate::error::NorthstarError;

/// Physical column as reported by the backing engine.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Produces the per-user aggregate table.
pub trait AggregateSource {
    /// Human-readable origin, used in logs and reports.
    fn describe(&self) -> String;

    fn load(&self) -> Result<AggregateTable, NorthstarError>;
}
