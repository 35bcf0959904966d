//! MedCode Export
//!
//! Presentation helpers for the outputs of a coding run.
//!
//! ## What lives here
//!
//! - Per-stage plain-text rendering of a stage output ([`format_stage_output`])
//! - JSON export of a single stage output to `CodingOutput_<date>.json`
//! - A Markdown coding report built from the Explainer output, written to
//!   `coding_report_<date>.md`
//! - A simplification record (input, result and options) written to
//!   `simplified-medical-text-<date>.json`
//!
//! Nothing here talks to the workflow engine. Callers pass in outputs they already hold,
//! usually from [`medcode_core::PipelineRun::output_of`].
//!
//! ## Example Usage
//!
//! ```no_run
//! use medcode_export::ExportService;
//! use serde_json::json;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ExportService::new(Path::new("out"))?;
//! let explainer = json!({ "explanations": [] });
//! let path = service.write_json(Some(&explainer), chrono::Utc::now().date_naive())?;
//! println!("wrote {}", path.display());
//! # Ok(())
//! # }
//! ```

mod constants;
mod export;
mod format;

pub use constants::{CODING_REPORT_PREFIX, JSON_EXPORT_PREFIX, SIMPLIFICATION_EXPORT_PREFIX};
pub use export::{
    coding_report_filename, json_export_filename, render_coding_report,
    simplification_export_filename, simplification_record, ExportService,
};
pub use format::format_stage_output;

/// Errors that can occur while exporting outputs
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// There was no output to export
    #[error("No data available for download")]
    NoData,

    /// Output directory does not exist or is not a directory
    #[error("Invalid output directory: {0}")]
    InvalidOutputDirectory(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialised
    #[error("Serialisation error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;
