//! Staged-output extraction.
//!
//! Turns a loosely structured run response into exactly one output value per catalog stage.
//! The upstream response shape is not versioned, so every step degrades instead of failing:
//!
//! 1. locate the candidate outputs collection (nested `outputs[0].outputs`, else top-level
//!    `outputs`, else nothing),
//! 2. pull a text blob from `results.message.text` or `outputs.message.message`,
//! 3. strip fenced-code marker lines and parse the remainder as JSON, keeping unparseable
//!    text as `{ "raw_text": ... }`,
//! 4. assign each parsed object to the first stage whose signature key it carries (a later
//!    object for the same stage replaces an earlier one),
//! 5. fill every stage left without output with a "No output found for ..." placeholder.
//!
//! Extraction never returns an error.

use crate::constants::{CODE_FENCE, PLACEHOLDER_MESSAGE_KEY, RAW_TEXT_KEY};
use crate::stages::{StageCatalog, StageDefinition};
use serde_json::{json, Value};

/// One output value per catalog stage, in catalog order.
#[derive(Clone, Debug, PartialEq)]
pub struct StageOutputs {
    outputs: Vec<Value>,
    matched: Vec<bool>,
    unrecognised: usize,
}

impl StageOutputs {
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.outputs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.outputs.iter()
    }

    /// True when the stage at `index` received real upstream output.
    pub fn is_matched(&self, index: usize) -> bool {
        self.matched.get(index).copied().unwrap_or(false)
    }

    /// Number of stages that received real upstream output.
    pub fn matched_count(&self) -> usize {
        self.matched.iter().filter(|m| **m).count()
    }

    /// Upstream values that carried no signature key and were dropped.
    pub fn unrecognised_count(&self) -> usize {
        self.unrecognised
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.outputs
    }
}

/// Maps a raw run response onto the stage catalog.
pub fn extract_stage_outputs(response: &Value, catalog: &StageCatalog) -> StageOutputs {
    let candidates = candidate_outputs(response);
    tracing::debug!("found {} candidate outputs", candidates.len());

    let parsed: Vec<Value> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let value = parse_stage_text(stage_text(candidate));
            tracing::debug!(index, "parsed stage output: {value}");
            value
        })
        .collect();

    let mut slots: Vec<Option<Value>> = vec![None; catalog.len()];
    let mut unrecognised = 0usize;
    for value in parsed {
        match match_stage(&value, catalog) {
            Some(index) => slots[index] = Some(value),
            None => unrecognised += 1,
        }
    }
    if unrecognised > 0 {
        tracing::debug!("dropped {unrecognised} outputs without a signature key");
    }

    let matched = slots.iter().map(Option::is_some).collect();
    let outputs = slots
        .into_iter()
        .zip(catalog.iter())
        .map(|(slot, definition)| slot.unwrap_or_else(|| placeholder(definition)))
        .collect();

    StageOutputs {
        outputs,
        matched,
        unrecognised,
    }
}

/// Placeholder carried by a stage that produced no recognisable output.
pub fn placeholder(definition: &StageDefinition) -> Value {
    json!({ PLACEHOLDER_MESSAGE_KEY: format!("No output found for {}", definition.name) })
}

/// Removes a leading and a trailing fenced-code marker line.
///
/// Surrounding whitespace is ignored so a trailing newline after the closing fence does not
/// hide it. The result is trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim().split('\n').collect();

    if lines
        .first()
        .is_some_and(|line| line.trim().starts_with(CODE_FENCE))
    {
        lines.remove(0);
    }
    if lines
        .last()
        .is_some_and(|line| line.trim().starts_with(CODE_FENCE))
    {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

/// Parses a stage's text blob, wrapping it as `{ "raw_text": blob }` when it is not JSON.
pub fn parse_stage_text(text: &str) -> Value {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("stage text is not JSON ({e}); keeping raw text");
            json!({ RAW_TEXT_KEY: text })
        }
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn candidate_outputs(response: &Value) -> &[Value] {
    let top = response.get("outputs").filter(|v| is_truthy(v));

    let nested = top
        .and_then(|outputs| outputs.get(0))
        .filter(|first| is_truthy(first))
        .and_then(|first| first.get("outputs"))
        .filter(|v| is_truthy(v));

    match nested.or(top) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            tracing::debug!("outputs collection is not an array");
            &[]
        }
        None => {
            tracing::debug!("no outputs found in response structure");
            &[]
        }
    }
}

fn stage_text(candidate: &Value) -> &str {
    let primary = candidate.pointer("/results/message/text");
    let fallback = candidate.pointer("/outputs/message/message");

    [primary, fallback]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|text| !text.is_empty())
        .unwrap_or("")
}

fn match_stage(value: &Value, catalog: &StageCatalog) -> Option<usize> {
    let object = value.as_object()?;
    catalog
        .iter()
        .position(|definition| object.contains_key(&definition.signature_key))
}

/// Upstream field presence follows loose truthiness: null, false, 0 and "" count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
