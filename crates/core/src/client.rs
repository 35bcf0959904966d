//! The workflow client.
//!
//! One submitted note produces exactly one upstream run. The response is mapped onto the
//! configured stage catalog and then played back to the caller stage by stage.

use crate::config::ClientConfig;
use crate::extraction::{extract_stage_outputs, StageOutputs};
use crate::playback::Playback;
use crate::request::{PipelineRequest, RunPayload, SessionId};
use crate::run::{PipelineRun, StageUpdate};
use crate::stages::StageCatalog;
use crate::transport::{HttpTransport, WorkflowTransport};
use crate::WorkflowResult;
use serde_json::Value;

/// Client for the hosted coding and simplification flows.
///
/// Holds the configuration, the transport and the current session id. Only one run is
/// expected to be active at a time; nothing here guards against concurrent submissions.
#[derive(Debug)]
pub struct WorkflowClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    session: SessionId,
}

impl WorkflowClient<HttpTransport> {
    /// Client talking HTTP to the configured base URL.
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(config.base_url().clone());
        Self::with_transport(config, transport)
    }
}

impl<T: WorkflowTransport> WorkflowClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let session = SessionId::generate();
        tracing::info!("workflow session {session} started");
        Self {
            config,
            transport,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stages(&self) -> &StageCatalog {
        self.config.stages()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session_id(&self) -> &str {
        self.session.as_str()
    }

    pub(crate) fn session(&self) -> &SessionId {
        &self.session
    }

    /// Starts a new upstream session. An in-flight call is not affected.
    pub fn reset_session(&mut self) {
        self.session = SessionId::generate();
        tracing::info!("workflow session reset to {}", self.session);
    }

    /// A fresh, idle run shaped by this client's catalog.
    pub fn new_run(&self) -> PipelineRun {
        PipelineRun::new(self.stages())
    }

    /// Issues the coding run and returns the raw upstream response.
    pub async fn run_coding_flow(&self, request: &PipelineRequest) -> WorkflowResult<Value> {
        let payload = RunPayload::for_request(request, &self.session)?;
        tracing::info!(
            request_id = request.id(),
            session_id = self.session_id(),
            "submitting note for coding"
        );
        self.transport
            .run_flow(self.config.coding_flow_id(), &payload)
            .await
    }

    /// Maps a raw response onto this client's stage catalog.
    pub fn extract(&self, response: &Value) -> StageOutputs {
        extract_stage_outputs(response, self.stages())
    }

    /// Submits a note and plays the stage results back through `on_update`.
    ///
    /// The first stage is announced as running before the network call so the caller has
    /// something to show while waiting. After the response arrives every stage is announced
    /// as running and then completed, in order, at the configured pace.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses are returned as-is; no retry is attempted.
    pub async fn submit<F>(
        &self,
        request: &PipelineRequest,
        mut on_update: F,
    ) -> WorkflowResult<Value>
    where
        F: FnMut(StageUpdate),
    {
        on_update(StageUpdate::running(0));

        let response = match self.run_coding_flow(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("coding flow failed: {e}");
                return Err(e);
            }
        };

        let outputs = self.extract(&response);
        tracing::info!(
            matched = outputs.matched_count(),
            stages = outputs.len(),
            "extracted stage outputs"
        );

        Playback::new(self.config.pacing())
            .play(outputs, &mut on_update)
            .await;

        Ok(response)
    }

    /// Drives `run` through a full submission.
    ///
    /// On success the run holds every stage's output and the raw response. On failure the
    /// stage that was active is flagged as errored, completed stages keep their output, and
    /// the error is returned.
    pub async fn run_pipeline(
        &self,
        request: &PipelineRequest,
        run: &mut PipelineRun,
    ) -> WorkflowResult<()> {
        self.run_pipeline_with(request, run, |_| {}).await
    }

    /// Like [`WorkflowClient::run_pipeline`], also showing each update to `observe` before it
    /// is applied to `run`.
    pub async fn run_pipeline_with<F>(
        &self,
        request: &PipelineRequest,
        run: &mut PipelineRun,
        mut observe: F,
    ) -> WorkflowResult<()>
    where
        F: FnMut(&StageUpdate),
    {
        run.begin();
        let result = self
            .submit(request, |update| {
                observe(&update);
                run.apply(update);
            })
            .await;
        match result {
            Ok(response) => {
                run.finish(response);
                Ok(())
            }
            Err(e) => {
                run.fail();
                Err(e)
            }
        }
    }
}
