//! # MedCode Core
//!
//! Client for the clinical-note coding workflow hosted on a Langflow-style engine.
//!
//! This crate contains:
//! - Building the coding request and the run payload sent upstream
//! - Extracting per-stage outputs from the engine's nested response
//! - Paced playback of stage results to a progress callback
//! - Caller-owned run state (which stage is active, what each produced)
//! - The single-shot plain-language simplification flow
//!
//! **No presentation concerns**: rendering and file export live in `medcode-export`; the
//! command-line surface lives in `medcode-cli`.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod extraction;
pub mod playback;
pub mod request;
pub mod run;
pub mod simplify;
pub mod stages;
pub mod transport;

pub use client::WorkflowClient;
pub use config::{pacing_from_env_value, stage_catalog_from_env_value, ClientConfig};
pub use error::{WorkflowError, WorkflowResult};
pub use extraction::{extract_stage_outputs, StageOutputs};
pub use playback::{Playback, PlaybackPacing};
pub use request::{PipelineRequest, RunPayload, SessionId};
pub use run::{PipelineRun, StageUpdate};
pub use simplify::{
    Simplification, SimplificationLevel, SimplificationSource, SimplifyOutcome,
    SimplifyRequest, TargetAudience,
};
pub use stages::{PipelineStage, StageCatalog, StageDefinition, StageStatus};
pub use transport::{HttpTransport, WorkflowTransport};

// Re-export the shared value types so callers need only this crate.
pub use medcode_types::{Gender, NonEmptyText, PatientMetadata, TextError};
