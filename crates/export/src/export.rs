//! Writing stage outputs and the coding report to disk.

use crate::constants::{
    CODING_REPORT_PREFIX, EXPLANATIONS_HEADING, EXPLANATIONS_KEY, JSON_EXPORT_PREFIX,
    NO_EXPLANATIONS, REPORT_TITLE, SIMPLIFICATION_EXPORT_PREFIX,
};
use crate::format::explanation_text;
use crate::{ExportError, ExportResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use medcode_core::{Simplification, SimplifyRequest};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// `CodingOutput_<YYYY-MM-DD>.json`
pub fn json_export_filename(date: NaiveDate) -> String {
    format!("{JSON_EXPORT_PREFIX}_{}.json", date.format("%Y-%m-%d"))
}

/// `coding_report_<YYYY-MM-DD>.md`
pub fn coding_report_filename(date: NaiveDate) -> String {
    format!("{CODING_REPORT_PREFIX}_{}.md", date.format("%Y-%m-%d"))
}

/// `simplified-medical-text-<YYYY-MM-DD>.json`
pub fn simplification_export_filename(date: NaiveDate) -> String {
    format!("{SIMPLIFICATION_EXPORT_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}

/// JSON record of one simplification: the input, the result and the options used.
///
/// Patient fields that were not supplied are written as empty strings.
pub fn simplification_record(
    request: &SimplifyRequest,
    simplification: &Simplification,
    generated_at: DateTime<Utc>,
) -> Value {
    let patient = &request.patient;
    json!({
        "originalText": request.text.as_str(),
        "simplifiedText": simplification.text,
        "simplificationLevel": request.level.as_str(),
        "targetAudience": request.audience.as_str(),
        "patientInfo": {
            "id": patient.patient_id_or(""),
            "name": patient.patient_name_or(""),
            "dob": patient.date_of_birth_or(""),
            "gender": patient.gender_or(""),
        },
        "timestamp": generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Renders the coding report for an Explainer output.
///
/// Report format produced:
/// ```markdown
/// # Clinical Coding Report
///
/// Generated: 2025-01-31 14:05:00 UTC
///
/// ## Code Explanations:
///
/// - I10: High blood pressure (Audit: BP 160/95)
/// ```
///
/// When the output has no explanations the list is replaced by
/// `No explanations available.`
pub fn render_coding_report(explainer_output: &Value, generated_at: DateTime<Utc>) -> String {
    let mut report = format!(
        "# {REPORT_TITLE}\n\nGenerated: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    match explainer_output
        .get(EXPLANATIONS_KEY)
        .and_then(Value::as_array)
    {
        Some(explanations) => {
            report.push_str(&format!("## {EXPLANATIONS_HEADING}\n\n"));
            for explanation in explanations {
                report.push_str(&format!("- {}\n", explanation_text(explanation)));
            }
        }
        None => {
            report.push_str(NO_EXPLANATIONS);
            report.push('\n');
        }
    }

    report
}

/// Writes exports into a single output directory.
#[derive(Debug)]
pub struct ExportService {
    out_dir: PathBuf,
}

impl ExportService {
    /// Creates a new `ExportService` writing into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidOutputDirectory`] if `out_dir` does not exist or is not a
    /// directory.
    pub fn new(out_dir: &Path) -> ExportResult<Self> {
        if !out_dir.is_dir() {
            return Err(ExportError::InvalidOutputDirectory(format!(
                "Not an existing directory: {}",
                out_dir.display()
            )));
        }
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
        })
    }

    /// Writes a stage output as pretty-printed JSON and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoData`] if there is no output.
    pub fn write_json(&self, output: Option<&Value>, date: NaiveDate) -> ExportResult<PathBuf> {
        let output = output.ok_or(ExportError::NoData)?;
        let path = self.out_dir.join(json_export_filename(date));
        fs::write(&path, serde_json::to_string_pretty(output)?)?;
        tracing::info!("wrote JSON export to {}", path.display());
        Ok(path)
    }

    /// Writes the coding report for an Explainer output and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoData`] if there is no output.
    pub fn write_coding_report(
        &self,
        explainer_output: Option<&Value>,
        generated_at: DateTime<Utc>,
    ) -> ExportResult<PathBuf> {
        let output = explainer_output.ok_or(ExportError::NoData)?;
        let path = self
            .out_dir
            .join(coding_report_filename(generated_at.date_naive()));
        fs::write(&path, render_coding_report(output, generated_at))?;
        tracing::info!("wrote coding report to {}", path.display());
        Ok(path)
    }

    /// Writes a simplification record and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoData`] if the simplified text is empty.
    pub fn write_simplification(
        &self,
        request: &SimplifyRequest,
        simplification: &Simplification,
        generated_at: DateTime<Utc>,
    ) -> ExportResult<PathBuf> {
        if simplification.text.is_empty() {
            return Err(ExportError::NoData);
        }
        let record = simplification_record(request, simplification, generated_at);
        let path = self
            .out_dir
            .join(simplification_export_filename(generated_at.date_naive()));
        fs::write(&path, serde_json::to_string_pretty(&record)?)?;
        tracing::info!("wrote simplification export to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use medcode_core::{
        Gender, NonEmptyText, SimplificationLevel, SimplificationSource, TargetAudience,
    };
    use std::time::Duration;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 14, 5, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn filenames_carry_the_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).expect("date");
        assert_eq!(json_export_filename(date), "CodingOutput_2025-03-07.json");
        assert_eq!(coding_report_filename(date), "coding_report_2025-03-07.md");
    }

    #[test]
    fn report_lists_explanations() {
        let output = json!({
            "explanations": [
                { "code": "I10", "layperson": "High blood pressure", "audit": "BP 160/95" },
                { "code": "R07.9", "layperson": "Chest pain", "audit": "Presenting complaint" }
            ]
        });

        let report = render_coding_report(&output, generated_at());
        assert_eq!(
            report,
            "# Clinical Coding Report\n\n\
             Generated: 2025-01-31 14:05:00 UTC\n\n\
             ## Code Explanations:\n\n\
             - I10: High blood pressure (Audit: BP 160/95)\n\
             - R07.9: Chest pain (Audit: Presenting complaint)\n"
        );
    }

    #[test]
    fn report_without_explanations_says_so() {
        let report = render_coding_report(&json!({ "message": "nothing" }), generated_at());
        assert!(report.ends_with("No explanations available.\n"));
        assert!(!report.contains("Code Explanations:"));
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ExportService::new(&dir.path().join("missing")).expect_err("missing dir");
        assert!(matches!(err, ExportError::InvalidOutputDirectory(_)));
    }

    #[test]
    fn writes_pretty_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new(dir.path()).expect("service");
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).expect("date");

        let output = json!({ "explanations": [] });
        let path = service.write_json(Some(&output), date).expect("write");

        assert_eq!(path, dir.path().join("CodingOutput_2025-01-31.json"));
        let written = fs::read_to_string(&path).expect("read back");
        assert_eq!(written, "{\n  \"explanations\": []\n}");
    }

    #[test]
    fn missing_output_is_no_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new(dir.path()).expect("service");
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).expect("date");

        let err = service.write_json(None, date).expect_err("no data");
        assert!(matches!(err, ExportError::NoData));
        assert_eq!(err.to_string(), "No data available for download");
        assert!(matches!(
            service.write_coding_report(None, generated_at()),
            Err(ExportError::NoData)
        ));
    }

    #[test]
    fn writes_report_named_for_generation_date() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new(dir.path()).expect("service");

        let path = service
            .write_coding_report(Some(&json!({})), generated_at())
            .expect("write");
        assert_eq!(path, dir.path().join("coding_report_2025-01-31.md"));
        assert!(fs::read_to_string(path)
            .expect("read back")
            .starts_with("# Clinical Coding Report"));
    }

    fn simplified(text: &str) -> (SimplifyRequest, Simplification) {
        let mut request =
            SimplifyRequest::new(NonEmptyText::new("Acute lumbar strain.").expect("text"));
        request.level = SimplificationLevel::Basic;
        request.audience = TargetAudience::Elderly;
        request.patient.patient_name = NonEmptyText::optional("Sarah Williams");
        request.patient.gender = Some(Gender::Female);
        let simplification = Simplification {
            text: text.to_string(),
            reading_level: 4.0,
            source: SimplificationSource::Fallback,
            processing_time: Duration::from_millis(3),
        };
        (request, simplification)
    }

    #[test]
    fn writes_simplification_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new(dir.path()).expect("service");
        let (request, simplification) = simplified("Sudden lower back strain.");

        let path = service
            .write_simplification(&request, &simplification, generated_at())
            .expect("write");

        assert_eq!(path, dir.path().join("simplified-medical-text-2025-01-31.json"));
        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
        assert_eq!(
            written,
            json!({
                "originalText": "Acute lumbar strain.",
                "simplifiedText": "Sudden lower back strain.",
                "simplificationLevel": "basic",
                "targetAudience": "elderly",
                "patientInfo": { "id": "", "name": "Sarah Williams", "dob": "", "gender": "female" },
                "timestamp": "2025-01-31T14:05:00.000Z"
            })
        );
    }

    #[test]
    fn empty_simplification_is_no_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new(dir.path()).expect("service");
        let (request, simplification) = simplified("");

        let err = service
            .write_simplification(&request, &simplification, generated_at())
            .expect_err("no data");
        assert!(matches!(err, ExportError::NoData));
    }
}
