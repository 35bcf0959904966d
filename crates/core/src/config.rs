//! Client runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into [`crate::WorkflowClient`].
//! Nothing in this crate reads process environment variables; the helpers below accept the
//! raw values so binaries decide where they come from.

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_CODING_FLOW_ID, DEFAULT_SIMPLIFY_FLOW_ID};
use crate::playback::PlaybackPacing;
use crate::stages::StageCatalog;
use crate::{WorkflowError, WorkflowResult};
use std::path::PathBuf;
use std::time::Duration;

/// Workflow client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: reqwest::Url,
    coding_flow_id: String,
    simplify_flow_id: String,
    pacing: PlaybackPacing,
    stages: StageCatalog,
}

impl ClientConfig {
    /// Create a new `ClientConfig` with default pacing and the coding stage catalog.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidConfig`] if the base URL is not an absolute http(s) URL
    /// or either flow id is blank.
    pub fn new(
        base_url: &str,
        coding_flow_id: impl Into<String>,
        simplify_flow_id: impl Into<String>,
    ) -> WorkflowResult<Self> {
        let base_url = reqwest::Url::parse(base_url.trim())
            .map_err(|e| WorkflowError::InvalidConfig(format!("invalid base URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(WorkflowError::InvalidConfig(format!(
                "base URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let coding_flow_id = coding_flow_id.into().trim().to_string();
        let simplify_flow_id = simplify_flow_id.into().trim().to_string();
        if coding_flow_id.is_empty() || simplify_flow_id.is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "flow id cannot be empty".into(),
            ));
        }

        Ok(Self {
            base_url,
            coding_flow_id,
            simplify_flow_id,
            pacing: PlaybackPacing::default(),
            stages: StageCatalog::coding(),
        })
    }

    /// Configuration pointing at a local engine with the deployed flow ids.
    pub fn local() -> WorkflowResult<Self> {
        Self::new(
            DEFAULT_BASE_URL,
            DEFAULT_CODING_FLOW_ID,
            DEFAULT_SIMPLIFY_FLOW_ID,
        )
    }

    pub fn with_pacing(mut self, pacing: PlaybackPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_stages(mut self, stages: StageCatalog) -> Self {
        self.stages = stages;
        self
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    pub fn coding_flow_id(&self) -> &str {
        &self.coding_flow_id
    }

    pub fn simplify_flow_id(&self) -> &str {
        &self.simplify_flow_id
    }

    pub fn pacing(&self) -> PlaybackPacing {
        self.pacing
    }

    pub fn stages(&self) -> &StageCatalog {
        &self.stages
    }
}

/// Parse playback pacing from an optional string value.
///
/// Accepted forms (milliseconds): `"800-2000"` for a range, `"500"` for a fixed pause, `"0"`
/// for no pause. `None` or blank returns the default 800–2000 ms range.
pub fn pacing_from_env_value(value: Option<String>) -> WorkflowResult<PlaybackPacing> {
    let Some(value) = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(PlaybackPacing::default());
    };

    let parse_ms = |s: &str| -> WorkflowResult<Duration> {
        s.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                WorkflowError::InvalidConfig(format!(
                    "playback delay must be milliseconds or a 'min-max' range, got '{value}'"
                ))
            })
    };

    match value.split_once('-') {
        Some((min, max)) => PlaybackPacing::new(parse_ms(min)?, parse_ms(max)?),
        None => Ok(PlaybackPacing::fixed(parse_ms(value.as_str())?)),
    }
}

/// Load a stage catalog from an optional YAML file path.
///
/// `None` or blank returns the built-in coding catalog.
pub fn stage_catalog_from_env_value(value: Option<String>) -> WorkflowResult<StageCatalog> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(path) => StageCatalog::load(&PathBuf::from(path)),
        None => Ok(StageCatalog::coding()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_config_uses_defaults() {
        let cfg = ClientConfig::local().expect("valid defaults");
        assert_eq!(cfg.base_url().as_str(), "http://localhost:7860/");
        assert_eq!(cfg.coding_flow_id(), DEFAULT_CODING_FLOW_ID);
        assert_eq!(cfg.stages().len(), 7);
        assert_eq!(cfg.pacing(), PlaybackPacing::default());
    }

    #[test]
    fn rejects_bad_urls_and_blank_flow_ids() {
        assert!(matches!(
            ClientConfig::new("not a url", "a", "b"),
            Err(WorkflowError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::new("ftp://example.org", "a", "b"),
            Err(WorkflowError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::new("http://example.org", "  ", "b"),
            Err(WorkflowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parses_pacing_values() {
        assert_eq!(
            pacing_from_env_value(None).expect("default"),
            PlaybackPacing::default()
        );
        assert!(pacing_from_env_value(Some("0".into()))
            .expect("zero")
            .is_immediate());

        let range = pacing_from_env_value(Some(" 100-250 ".into())).expect("range");
        assert_eq!(range.min(), Duration::from_millis(100));
        assert_eq!(range.max(), Duration::from_millis(250));

        assert!(pacing_from_env_value(Some("fast".into())).is_err());
        assert!(pacing_from_env_value(Some("300-100".into())).is_err());
    }

    #[test]
    fn blank_catalog_path_uses_coding_catalog() {
        let catalog = stage_catalog_from_env_value(Some("   ".into())).expect("default catalog");
        assert_eq!(catalog, StageCatalog::coding());
    }

    #[test]
    fn missing_catalog_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.yaml");
        let err = stage_catalog_from_env_value(Some(missing.display().to_string()))
            .expect_err("missing file");
        assert!(matches!(err, WorkflowError::Io(_)));
    }
}
