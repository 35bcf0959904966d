//! Request envelope, session identifier and the outbound run payload.

use crate::constants::{CHAT_IO_TYPE, REQUEST_ROLE, SESSION_PREFIX};
use crate::WorkflowResult;
use chrono::Utc;
use medcode_types::{NonEmptyText, PatientMetadata};
use serde::{Deserialize, Serialize};

/// A clinical note submitted for coding.
///
/// Built once and never mutated afterwards; the whole envelope is serialised into the
/// `input_value` of the run payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    id: String,
    role: String,
    content: RequestContent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContent {
    pub note_text: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PatientMetadata>,
}

impl PipelineRequest {
    /// Creates a request with a freshly generated identifier.
    pub fn new(note_text: NonEmptyText, metadata: Option<PatientMetadata>) -> Self {
        Self::with_id(generate_request_id(), note_text, metadata)
    }

    /// Creates a request with a caller-supplied identifier.
    pub fn with_id(
        id: impl Into<String>,
        note_text: NonEmptyText,
        metadata: Option<PatientMetadata>,
    ) -> Self {
        Self {
            id: id.into(),
            role: REQUEST_ROLE.to_string(),
            content: RequestContent {
                note_text,
                metadata,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn note_text(&self) -> &NonEmptyText {
        &self.content.note_text
    }

    pub fn metadata(&self) -> Option<&PatientMetadata> {
        self.content.metadata.as_ref()
    }

    /// JSON text placed in the payload's `input_value`.
    pub fn to_input_value(&self) -> WorkflowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Canonical request id: 32 lowercase hex characters.
fn generate_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Opaque identifier the upstream uses to correlate calls from one client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates `coding_<unix millis>_<32 hex>`, distinct on every call.
    pub fn generate() -> Self {
        Self(format!(
            "{SESSION_PREFIX}_{}_{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a single POST to the run-flow endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunPayload {
    pub input_value: String,
    pub input_type: &'static str,
    pub output_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweaks: Option<serde_json::Value>,
}

impl RunPayload {
    /// Chat-in/chat-out payload with only an input value.
    pub fn chat(input_value: impl Into<String>) -> Self {
        Self {
            input_value: input_value.into(),
            input_type: CHAT_IO_TYPE,
            output_type: CHAT_IO_TYPE,
            session_id: None,
            tweaks: None,
        }
    }

    /// Payload for a coding run: the serialised request plus the session id.
    pub fn for_request(request: &PipelineRequest, session: &SessionId) -> WorkflowResult<Self> {
        Ok(Self::chat(request.to_input_value()?).with_session(session))
    }

    pub fn with_session(mut self, session: &SessionId) -> Self {
        self.session_id = Some(session.as_str().to_string());
        self
    }

    pub fn with_tweaks(mut self, tweaks: serde_json::Value) -> Self {
        self.tweaks = Some(tweaks);
        self
    }
}
