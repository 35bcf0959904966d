//! Constants used throughout the workflow client.
//!
//! Endpoint defaults, wire literals and playback timing live here so there is exactly one
//! place to change when a deployment moves.

use std::time::Duration;

/// Default workflow engine base URL (a local Langflow instance).
pub const DEFAULT_BASE_URL: &str = "http://localhost:7860";

/// Path segment of the "run flow" endpoint; the flow id is appended.
pub const RUN_FLOW_PATH: &str = "api/v1/run";

/// Flow id of the deployed multi-stage coding flow.
pub const DEFAULT_CODING_FLOW_ID: &str = "99ecb228-9493-459d-ac2e-1aa0abe0ae48";

/// Flow id of the deployed text simplification flow.
pub const DEFAULT_SIMPLIFY_FLOW_ID: &str = "99ecb228-9493-459d-ac2e-1aa0abe0ae48";

/// Input and output type sent with every run.
pub const CHAT_IO_TYPE: &str = "chat";

/// Role attached to every submitted note.
pub const REQUEST_ROLE: &str = "user";

/// Prefix of generated session identifiers.
pub const SESSION_PREFIX: &str = "coding";

/// Lower bound of the randomised pause between playback notifications.
pub const DEFAULT_PLAYBACK_MIN_DELAY: Duration = Duration::from_millis(800);

/// Upper bound of the randomised pause between playback notifications.
pub const DEFAULT_PLAYBACK_MAX_DELAY: Duration = Duration::from_millis(2000);

/// Key used to wrap stage text that is not valid JSON.
pub const RAW_TEXT_KEY: &str = "raw_text";

/// Key carrying the placeholder message for stages without output.
pub const PLACEHOLDER_MESSAGE_KEY: &str = "message";

/// Error message recorded against the stage that was active when a run failed.
pub const STAGE_FAILURE_MESSAGE: &str = "Failed to execute";

/// Opening sequence of a fenced code block.
pub const CODE_FENCE: &str = "```";
