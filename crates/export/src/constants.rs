//! Constants for exported file names and report text.

/// Filename prefix of a JSON stage export.
pub const JSON_EXPORT_PREFIX: &str = "CodingOutput";

/// Filename prefix of a simplification export.
pub const SIMPLIFICATION_EXPORT_PREFIX: &str = "simplified-medical-text";

/// Filename prefix of the coding report.
pub const CODING_REPORT_PREFIX: &str = "coding_report";

pub(crate) const REPORT_TITLE: &str = "Clinical Coding Report";
pub(crate) const EXPLANATIONS_HEADING: &str = "Code Explanations:";
pub(crate) const NO_EXPLANATIONS: &str = "No explanations available.";

/// Output key the coding report reads.
pub(crate) const EXPLANATIONS_KEY: &str = "explanations";

/// Separator placed between chunks when rendering the chunker output.
pub(crate) const CHUNK_SEPARATOR: &str = "\n---\n";
