//! Stage catalog and per-stage state.
//!
//! The catalog is the single configuration artifact that fixes how many stages a run has,
//! their order, and the signature key used to recognise each stage's output in an upstream
//! response. Everything else (extraction, playback, run state, display) is driven from it.

use crate::{WorkflowError, WorkflowResult};
use medcode_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Built-in coding flow: `(id, name, label, signature_key)` in playback order.
const CODING_STAGES: [(&str, &str, &str, &str); 7] = [
    ("cleaner", "NoteCleanerAgent", "Note Cleaner", "cleaned_note"),
    ("chunker", "ChunkerAgent", "Chunker", "chunks"),
    (
        "retriever",
        "EmbeddingRetrieverAgent",
        "Embedding Retriever",
        "retrieved_codes",
    ),
    ("coder", "PrimaryCoderAgent", "Primary Coder", "suggested_codes"),
    ("validator", "ValidatorAgent", "Validator", "validation_results"),
    ("explainer", "ExplainerAgent", "Explainer", "explanations"),
    ("audit", "AuditFormatterAgent", "Audit Formatter", "audit_output"),
];

// ============================================================================
// Stage definitions
// ============================================================================

/// Static description of one stage of the upstream flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    /// Short stable identifier (for example `cleaner`).
    pub id: String,
    /// Agent name as the upstream flow calls it (for example `NoteCleanerAgent`).
    pub name: String,
    /// Human-readable display name.
    pub label: String,
    /// Top-level key whose presence identifies this stage's output object.
    pub signature_key: String,
}

impl StageDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        signature_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label: label.into(),
            signature_key: signature_key.into(),
        }
    }
}

/// Ordered, validated list of stage definitions.
///
/// Invariants (checked on construction):
/// - at least one stage,
/// - stage ids are unique,
/// - signature keys are unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageCatalog(Vec<StageDefinition>);

impl Default for StageCatalog {
    fn default() -> Self {
        Self::coding()
    }
}

impl StageCatalog {
    /// Builds a catalog from explicit definitions.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::StageCatalog`] if the list is empty or contains duplicate
    /// ids or signature keys.
    pub fn new(stages: Vec<StageDefinition>) -> WorkflowResult<Self> {
        if stages.is_empty() {
            return Err(WorkflowError::StageCatalog(
                "at least one stage is required".into(),
            ));
        }

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for stage in &stages {
            if !ids.insert(stage.id.as_str()) {
                return Err(WorkflowError::StageCatalog(format!(
                    "duplicate stage id '{}'",
                    stage.id
                )));
            }
            if !keys.insert(stage.signature_key.as_str()) {
                return Err(WorkflowError::StageCatalog(format!(
                    "duplicate signature key '{}'",
                    stage.signature_key
                )));
            }
        }

        Ok(Self(stages))
    }

    /// The seven-stage medical coding flow.
    pub fn coding() -> Self {
        Self(
            CODING_STAGES
                .iter()
                .map(|(id, name, label, key)| StageDefinition::new(*id, *name, *label, *key))
                .collect(),
        )
    }

    /// Parses a catalog from YAML text.
    ///
    /// ```yaml
    /// stages:
    ///   - id: cleaner
    ///     name: NoteCleanerAgent
    ///     label: Note Cleaner      # optional, defaults to name
    ///     signature_key: cleaned_note
    /// ```
    ///
    /// Schema mismatches report the failing path (for example `stages.1.signature_key`).
    pub fn from_yaml(yaml_text: &str) -> WorkflowResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, CatalogWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(WorkflowError::StageCatalog(format!(
                    "schema mismatch at {path}: {source}"
                )));
            }
        };

        let stages = wire
            .stages
            .into_iter()
            .map(|s| {
                let label = s
                    .label
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| s.name.to_string());
                StageDefinition::new(
                    s.id.as_str(),
                    s.name.as_str(),
                    label,
                    s.signature_key.as_str(),
                )
            })
            .collect();

        Self::new(stages)
    }

    /// Reads and parses a YAML catalog file.
    pub fn load(path: &Path) -> WorkflowResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed catalog; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StageDefinition> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StageDefinition> {
        self.0.iter()
    }

    /// Index of the stage with the given id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|s| s.id == id)
    }
}

impl<'a> IntoIterator for &'a StageCatalog {
    type Item = &'a StageDefinition;
    type IntoIter = std::slice::Iter<'a, StageDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    stages: Vec<StageWire>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StageWire {
    id: NonEmptyText,
    name: NonEmptyText,
    #[serde(default)]
    label: Option<String>,
    signature_key: NonEmptyText,
}

// ============================================================================
// Per-run stage state
// ============================================================================

/// Lifecycle of a single stage within a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Completed => "completed",
            StageStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A stage as seen by the caller during a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineStage {
    /// A fresh, pending stage for the given definition.
    pub fn pending(definition: &StageDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            status: StageStatus::Pending,
            output: None,
            error: None,
        }
    }
}
