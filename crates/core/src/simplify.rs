//! Plain-language simplification of clinical text.
//!
//! A single-shot flow: the note goes up with the reading level, audience and patient details
//! as tweaks, and the final agent's result comes back as the simplified text. When the flow
//! cannot be reached a local term-substitution fallback keeps the caller usable.

use crate::client::WorkflowClient;
use crate::request::RunPayload;
use crate::transport::WorkflowTransport;
use crate::{WorkflowError, WorkflowResult};
use medcode_types::{NonEmptyText, PatientMetadata, TextError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Reading level assumed when the flow does not report one.
const DEFAULT_READING_LEVEL: f64 = 8.0;

/// Text returned when the final result carries no usable text.
const UNUSABLE_RESULT_TEXT: &str = "Error processing text";

/// Placeholder sent for patient details that were not supplied.
const UNKNOWN: &str = "unknown";

/// Clinical terms and their plain-language replacements, applied in order.
const TERM_REPLACEMENTS: [(&str, &str); 15] = [
    ("hypertension", "high blood pressure"),
    ("myocardial infarction", "heart attack"),
    ("cerebrovascular accident", "stroke"),
    ("diabetes mellitus", "diabetes"),
    ("pneumonia", "lung infection"),
    ("exacerbated", "made worse"),
    ("alleviated", "made better"),
    ("administered", "given"),
    ("cardiovascular", "heart and blood vessel"),
    ("pulmonary", "lung"),
    ("gastrointestinal", "stomach and intestine"),
    ("bilateral", "on both sides"),
    ("unilateral", "on one side"),
    ("acute", "sudden"),
    ("chronic", "long-term"),
];

// ============================================================================
// Request options
// ============================================================================

/// Target reading level of the simplified text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimplificationLevel {
    Basic,
    #[default]
    Moderate,
    Advanced,
}

impl SimplificationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SimplificationLevel::Basic => "basic",
            SimplificationLevel::Moderate => "moderate",
            SimplificationLevel::Advanced => "advanced",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SimplificationLevel::Basic => "Elementary school level (Grade 3-5)",
            SimplificationLevel::Moderate => "Middle school level (Grade 6-8)",
            SimplificationLevel::Advanced => "High school level (Grade 9-12)",
        }
    }

    /// Reading level attributed to the local fallback at this level.
    fn fallback_reading_level(self) -> f64 {
        match self {
            SimplificationLevel::Basic => 4.0,
            SimplificationLevel::Moderate => 7.0,
            SimplificationLevel::Advanced => 10.0,
        }
    }
}

impl FromStr for SimplificationLevel {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "moderate" => Ok(Self::Moderate),
            "advanced" => Ok(Self::Advanced),
            other => Err(TextError::Unrecognised(other.to_string())),
        }
    }
}

/// Who the simplified text is written for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    #[default]
    General,
    Elderly,
    Pediatric,
}

impl TargetAudience {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetAudience::General => "general",
            TargetAudience::Elderly => "elderly",
            TargetAudience::Pediatric => "pediatric",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TargetAudience::General => "Average adult patient",
            TargetAudience::Elderly => "Senior citizens with simpler language needs",
            TargetAudience::Pediatric => "Parents or guardians of young patients",
        }
    }
}

impl FromStr for TargetAudience {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "elderly" => Ok(Self::Elderly),
            "pediatric" | "paediatric" => Ok(Self::Pediatric),
            other => Err(TextError::Unrecognised(other.to_string())),
        }
    }
}

/// A note to simplify, with its presentation options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimplifyRequest {
    pub text: NonEmptyText,
    pub level: SimplificationLevel,
    pub audience: TargetAudience,
    pub patient: PatientMetadata,
}

impl SimplifyRequest {
    pub fn new(text: NonEmptyText) -> Self {
        Self {
            text,
            level: SimplificationLevel::default(),
            audience: TargetAudience::default(),
            patient: PatientMetadata::default(),
        }
    }

    /// Flow tweaks; absent patient details are sent as `"unknown"`.
    pub fn tweaks(&self) -> Value {
        json!({
            "simplification_level": self.level.as_str(),
            "target_audience": self.audience.as_str(),
            "patient_id": self.patient.patient_id_or(UNKNOWN),
            "patient_name": self.patient.patient_name_or(UNKNOWN),
            "patient_dob": self.patient.date_of_birth_or(UNKNOWN),
            "patient_gender": self.patient.gender_or(UNKNOWN),
        })
    }
}

// ============================================================================
// Results
// ============================================================================

/// Where a simplification came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimplificationSource {
    Workflow,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Simplification {
    pub text: String,
    pub reading_level: f64,
    pub source: SimplificationSource,
    #[serde(with = "duration_secs")]
    pub processing_time: Duration,
}

/// Result of [`WorkflowClient::simplify_or_fallback`]: always usable text, plus the reason
/// the fallback was used, if it was.
#[derive(Debug)]
pub struct SimplifyOutcome {
    pub simplification: Simplification,
    pub fallback_reason: Option<WorkflowError>,
}

/// User-facing explanation for why the fallback was used.
pub fn fallback_notice(error: &WorkflowError) -> String {
    match error.status() {
        Some(404) => {
            "Medical text simplification workflow not found. Please check your Langflow setup."
                .to_string()
        }
        Some(500) => "Server error in simplification workflow. Please try again.".to_string(),
        _ => format!("Error simplifying medical text: {error}"),
    }
}

/// Text and reading level extracted from a simplification response.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSimplification {
    pub text: String,
    pub reading_level: f64,
}

/// Reads the final agent's result out of a simplification run response.
///
/// # Errors
///
/// Returns [`WorkflowError::InvalidResponse`] if `outputs[0].outputs` is missing, null or
/// otherwise empty-valued (`false`, `0`, `""`).
pub fn parse_simplify_response(response: &Value) -> WorkflowResult<ParsedSimplification> {
    let agent_outputs = response
        .get("outputs")
        .and_then(|outputs| outputs.get(0))
        .and_then(|first| first.get("outputs"))
        .filter(|outputs| is_present(outputs))
        .ok_or_else(|| {
            WorkflowError::InvalidResponse("invalid response structure from workflow".into())
        })?;

    // A non-array collection carries no agent results.
    let Some(final_output) = agent_outputs.as_array().and_then(|items| items.last()) else {
        return Ok(ParsedSimplification {
            text: String::new(),
            reading_level: DEFAULT_READING_LEVEL,
        });
    };

    let results = final_output.get("results").unwrap_or(&Value::Null);
    let parsed = match results {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(data) => ParsedSimplification {
                text: first_text(&data, &["simplified_text", "text"])
                    .unwrap_or(raw.as_str())
                    .to_string(),
                reading_level: data
                    .get("reading_level")
                    .and_then(Value::as_f64)
                    .filter(|level| *level != 0.0)
                    .unwrap_or(DEFAULT_READING_LEVEL),
            },
            Err(_) => ParsedSimplification {
                text: raw.clone(),
                reading_level: DEFAULT_READING_LEVEL,
            },
        },
        other => ParsedSimplification {
            text: first_text(other, &["simplified_text", "text"])
                .unwrap_or(UNUSABLE_RESULT_TEXT)
                .to_string(),
            reading_level: DEFAULT_READING_LEVEL,
        },
    };

    Ok(parsed)
}

/// Local stand-in: swaps known clinical terms for plain words and adds a level-specific lead-in.
pub fn mock_simplification(text: &str, level: SimplificationLevel) -> String {
    let mut simplified = text.to_string();
    for (pattern, replacement) in term_patterns() {
        simplified = pattern
            .replace_all(&simplified, regex::NoExpand(*replacement))
            .into_owned();
    }

    match level {
        SimplificationLevel::Basic => format!("Here's what this means in simple terms:\n\n{simplified}"),
        SimplificationLevel::Moderate => format!("Here's a clearer explanation:\n\n{simplified}"),
        SimplificationLevel::Advanced => simplified,
    }
}

fn term_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TERM_REPLACEMENTS
            .iter()
            .filter_map(|(term, replacement)| {
                Regex::new(&format!("(?i){}", regex::escape(term)))
                    .ok()
                    .map(|re| (re, *replacement))
            })
            .collect()
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}

fn first_text<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
}

// ============================================================================
// Client operations
// ============================================================================

impl<T: WorkflowTransport> WorkflowClient<T> {
    /// Runs the simplification flow.
    pub async fn simplify(&self, request: &SimplifyRequest) -> WorkflowResult<Simplification> {
        let started = Instant::now();
        let payload = RunPayload::chat(request.text.as_str())
            .with_session(self.session())
            .with_tweaks(request.tweaks());

        tracing::info!(
            level = request.level.as_str(),
            audience = request.audience.as_str(),
            "submitting text for simplification"
        );
        let response = self
            .transport()
            .run_flow(self.config().simplify_flow_id(), &payload)
            .await?;
        let parsed = parse_simplify_response(&response)?;

        Ok(Simplification {
            text: parsed.text,
            reading_level: parsed.reading_level,
            source: SimplificationSource::Workflow,
            processing_time: started.elapsed(),
        })
    }

    /// Runs the simplification flow, falling back to [`mock_simplification`] on any error.
    pub async fn simplify_or_fallback(&self, request: &SimplifyRequest) -> SimplifyOutcome {
        let started = Instant::now();
        match self.simplify(request).await {
            Ok(simplification) => SimplifyOutcome {
                simplification,
                fallback_reason: None,
            },
            Err(e) => {
                tracing::warn!("simplification flow failed, using local fallback: {e}");
                SimplifyOutcome {
                    simplification: Simplification {
                        text: mock_simplification(request.text.as_str(), request.level),
                        reading_level: request.level.fallback_reading_level(),
                        source: SimplificationSource::Fallback,
                        processing_time: started.elapsed(),
                    },
                    fallback_reason: Some(e),
                }
            }
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client, FakeTransport};
    use medcode_types::Gender;

    fn request(text: &str) -> SimplifyRequest {
        SimplifyRequest::new(NonEmptyText::new(text).expect("text"))
    }

    #[test]
    fn tweaks_default_unknown_patient_fields() {
        let mut req = request("Acute hypertension.");
        req.level = SimplificationLevel::Basic;
        req.audience = TargetAudience::Elderly;
        req.patient.gender = Some(Gender::Male);

        assert_eq!(
            req.tweaks(),
            json!({
                "simplification_level": "basic",
                "target_audience": "elderly",
                "patient_id": "unknown",
                "patient_name": "unknown",
                "patient_dob": "unknown",
                "patient_gender": "male"
            })
        );
    }

    #[test]
    fn option_descriptions_match_the_selector_labels() {
        let level: SimplificationLevel = "Basic".parse().expect("level");
        assert_eq!(level.description(), "Elementary school level (Grade 3-5)");
        assert_eq!(
            SimplificationLevel::Advanced.description(),
            "High school level (Grade 9-12)"
        );

        let audience: TargetAudience = " pediatric ".parse().expect("audience");
        assert_eq!(
            audience.description(),
            "Parents or guardians of young patients"
        );
        assert!("teenage".parse::<TargetAudience>().is_err());
    }

    #[test]
    fn parses_json_string_results() {
        let response = json!({
            "outputs": [{ "outputs": [
                { "results": "ignored" },
                { "results": "{\"simplified_text\":\"Your heart is fine.\",\"reading_level\":5}" }
            ]}]
        });

        let parsed = parse_simplify_response(&response).expect("parse");
        assert_eq!(parsed.text, "Your heart is fine.");
        assert_eq!(parsed.reading_level, 5.0);
    }

    #[test]
    fn plain_string_results_are_used_verbatim() {
        let response = json!({ "outputs": [{ "outputs": [{ "results": "Plain words." }] }] });
        let parsed = parse_simplify_response(&response).expect("parse");
        assert_eq!(parsed.text, "Plain words.");
        assert_eq!(parsed.reading_level, 8.0);
    }

    #[test]
    fn object_results_fall_back_through_known_keys() {
        let with_text = json!({ "outputs": [{ "outputs": [{ "results": { "text": "Short." } }] }] });
        assert_eq!(parse_simplify_response(&with_text).expect("parse").text, "Short.");

        let unusable = json!({ "outputs": [{ "outputs": [{ "results": { "other": 1 } }] }] });
        assert_eq!(
            parse_simplify_response(&unusable).expect("parse").text,
            "Error processing text"
        );

        let empty = json!({ "outputs": [{ "outputs": [] }] });
        assert_eq!(parse_simplify_response(&empty).expect("parse").text, "");
    }

    #[test]
    fn missing_nested_outputs_is_invalid() {
        let err = parse_simplify_response(&json!({ "outputs": [] })).expect_err("invalid");
        assert!(matches!(err, WorkflowError::InvalidResponse(_)));

        let null_outputs = json!({ "outputs": [{ "outputs": null }] });
        assert!(parse_simplify_response(&null_outputs).is_err());
    }

    #[test]
    fn non_array_agent_outputs_yield_empty_text() {
        let response = json!({ "outputs": [{ "outputs": { "results": "x" } }] });
        let parsed = parse_simplify_response(&response).expect("parse");
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.reading_level, 8.0);
    }

    #[test]
    fn mock_replaces_terms_case_insensitively() {
        let text = "Acute Myocardial Infarction with chronic HYPERTENSION.";
        assert_eq!(
            mock_simplification(text, SimplificationLevel::Advanced),
            "sudden heart attack with long-term high blood pressure."
        );
        assert!(mock_simplification("pneumonia", SimplificationLevel::Basic)
            .starts_with("Here's what this means in simple terms:\n\nlung infection"));
        assert_eq!(
            mock_simplification("ok", SimplificationLevel::Moderate),
            "Here's a clearer explanation:\n\nok"
        );
    }

    #[test]
    fn notices_are_status_specific() {
        let not_found = WorkflowError::HttpStatus {
            status: 404,
            body: String::new(),
        };
        assert!(fallback_notice(&not_found).contains("not found"));

        let server = WorkflowError::HttpStatus {
            status: 500,
            body: String::new(),
        };
        assert!(fallback_notice(&server).starts_with("Server error"));

        let other = WorkflowError::InvalidResponse("bad".into());
        assert!(fallback_notice(&other).starts_with("Error simplifying medical text"));
    }

    #[tokio::test]
    async fn simplify_sends_tweaks_and_session() {
        let client = client(FakeTransport::ok(json!({
            "outputs": [{ "outputs": [{ "results": { "simplified_text": "Simple." } }] }]
        })));

        let result = client.simplify(&request("Complex.")).await.expect("simplify");
        assert_eq!(result.text, "Simple.");
        assert_eq!(result.source, SimplificationSource::Workflow);

        let calls = client.transport().calls.lock().expect("calls lock");
        let (flow_id, payload) = &calls[0];
        assert_eq!(flow_id, client.config().simplify_flow_id());
        assert_eq!(payload.input_value, "Complex.");
        assert_eq!(payload.session_id.as_deref(), Some(client.session_id()));
        assert_eq!(
            payload.tweaks.as_ref().map(|t| &t["simplification_level"]),
            Some(&json!("moderate"))
        );
    }

    #[tokio::test]
    async fn falls_back_to_mock_on_server_error() {
        let client = client(FakeTransport::status(500));
        let mut req = request("Chronic pulmonary disease.");
        req.level = SimplificationLevel::Advanced;

        let outcome = client.simplify_or_fallback(&req).await;
        assert_eq!(outcome.simplification.source, SimplificationSource::Fallback);
        assert_eq!(outcome.simplification.text, "long-term lung disease.");
        assert_eq!(outcome.simplification.reading_level, 10.0);
        assert_eq!(outcome.fallback_reason.and_then(|e| e.status()), Some(500));
    }
}
