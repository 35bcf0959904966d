//! Plain-text rendering of stage outputs.
//!
//! Each stage is rendered according to the signature key its definition carries, so a
//! catalog loaded from file still formats sensibly: known keys get a tailored layout and
//! anything else falls back to pretty-printed JSON.

use crate::constants::{CHUNK_SEPARATOR, EXPLANATIONS_KEY};
use medcode_core::StageDefinition;
use serde_json::Value;

const NO_OUTPUT: &str = "No output available";

/// Renders one stage output for display.
///
/// Non-object outputs render as `"No output available"`. A missing or empty field renders
/// as a stage-specific "No …" message, except for the audit stage which then shows the
/// whole output.
pub fn format_stage_output(definition: &StageDefinition, output: &Value) -> String {
    if !output.is_object() {
        return NO_OUTPUT.to_string();
    }

    let key = definition.signature_key.as_str();
    let field = output.get(key).filter(|v| is_present(v));

    match key {
        "cleaned_note" => field
            .map(display_value)
            .unwrap_or_else(|| "No cleaned note available".to_string()),
        "chunks" => field
            .map(|chunks| match chunks.as_array() {
                Some(items) => items
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(CHUNK_SEPARATOR),
                None => display_value(chunks),
            })
            .unwrap_or_else(|| "No chunks available".to_string()),
        "retrieved_codes" => field
            .map(|codes| bullet_lines(codes, code_line))
            .unwrap_or_else(|| "No code candidates found".to_string()),
        "suggested_codes" => field
            .map(|codes| bullet_lines(codes, code_line))
            .unwrap_or_else(|| "No suggested codes".to_string()),
        "validation_results" => field
            .map(pretty)
            .unwrap_or_else(|| "No validation results".to_string()),
        EXPLANATIONS_KEY => field
            .map(|items| bullet_lines(items, explanation_line))
            .unwrap_or_else(|| "No explanations".to_string()),
        "audit_output" => pretty(field.unwrap_or(output)),
        _ => pretty(output),
    }
}

/// `<code>: <layperson> (Audit: <audit>)`
pub(crate) fn explanation_text(explanation: &Value) -> String {
    format!(
        "{}: {} (Audit: {})",
        field_text(explanation, "code"),
        field_text(explanation, "layperson"),
        field_text(explanation, "audit")
    )
}

fn explanation_line(explanation: &Value) -> String {
    format!("• {}", explanation_text(explanation))
}

fn code_line(code: &Value) -> String {
    format!(
        "• {}: {}",
        field_text(code, "code"),
        field_text(code, "description")
    )
}

fn bullet_lines(items: &Value, line: fn(&Value) -> String) -> String {
    match items.as_array() {
        Some(items) => items.iter().map(line).collect::<Vec<_>>().join("\n"),
        None => pretty(items),
    }
}

fn field_text(value: &Value, key: &str) -> String {
    value.get(key).map(display_value).unwrap_or_default()
}

/// Strings without quotes, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}
