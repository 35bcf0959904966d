/// Errors returned by the workflow client.
///
/// Only transport and configuration problems surface here. Malformed or partial upstream
/// output is never an error during extraction; it degrades to placeholders instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("workflow request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("workflow returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to decode workflow response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("unexpected workflow response: {0}")]
    InvalidResponse(String),
    #[error("failed to serialise request: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid stage catalog: {0}")]
    StageCatalog(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// HTTP status code carried by the error, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkflowError::HttpStatus { status, .. } => Some(*status),
            WorkflowError::Transport(e) | WorkflowError::Decode(e) => {
                e.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
