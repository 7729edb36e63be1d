// northstar-core/src/application/ports/renderer.rs

use crate::application::report::RunReport;
use crate::error::NorthstarError;

/// Turns a finished run into a human-readable document.
pub trait ReportRenderer {
    /// File name the rendered document is written under.
    fn file_name(&self) -> &str;

    fn render(&self, report: &RunReport) -> Result<String, NorthstarError>;
}
