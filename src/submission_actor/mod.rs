//! The canonical simulated user: runs the four submission stages in order.
//!
//! One [`Stage`] runs per task, so a user that has been given four iterations
//! has completed exactly one submission. A stage that fails for any reason
//! sends the user back to [`Stage::CreateSubmission`] with a clean slate.

pub mod error;
pub mod stages;

pub use error::*;
pub use stages::*;

use crate::framework::{LoadActor, TaskOutcome};
use crate::lifecycle::RunContext;
use crate::model::Resource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Links followed between stages.
pub const PROCESSES_LINK: &str = "processes";
pub const ADD_FILE_REFERENCE_LINK: &str = "add-file-reference";
pub const SELF_LINK: &str = "self";

#[derive(Debug, Default)]
pub struct SubmitAnalysisMetadata {
    stage: Stage,
    submission: Option<Resource>,
    analysis_process: Option<Resource>,
}

impl SubmitAnalysisMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stage the next task will run.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    async fn run_stage(&mut self, ctx: &RunContext) -> Result<(), SubmissionError> {
        let stage = self.stage;
        match stage {
            Stage::CreateSubmission => {
                let submission = ctx
                    .core
                    .create_submission("create analysis submission")
                    .await?
                    .ok_or(SubmissionError::NoResource { stage })?;
                self.submission = Some(submission);
                self.analysis_process = None;
            }
            Stage::AddAnalysisProcess => {
                let submission = self.submission(stage)?;
                let processes_link = submission.get_link(PROCESSES_LINK)?;
                let process = ctx
                    .core
                    .create_metadata(processes_link, &ctx.fixtures.analysis, "create analysis process")
                    .await?
                    .ok_or(SubmissionError::NoResource { stage })?;
                self.analysis_process = Some(process);
            }
            Stage::AddFileReferences => {
                let process = self
                    .analysis_process
                    .as_ref()
                    .ok_or(SubmissionError::MissingState {
                        stage,
                        missing: "analysis process",
                    })?;
                let file_reference_link = process.get_link(ADD_FILE_REFERENCE_LINK)?;
                for file in &ctx.fixtures.output_files {
                    ctx.core
                        .add_output_file_to_process(file_reference_link, file, "add analysis output file")
                        .await?;
                }
            }
            Stage::UploadFiles => {
                let submission_link = self.submission(stage)?.get_link(SELF_LINK)?;
                let upload_area = ctx
                    .core
                    .wait_for_upload_area(submission_link, ctx.upload_area_policy)
                    .await?;
                ctx.uploads
                    .upload_files(&upload_area, &ctx.fixtures.output_files)
                    .await?;
            }
        }
        Ok(())
    }

    fn submission(&self, stage: Stage) -> Result<&Resource, SubmissionError> {
        self.submission.as_ref().ok_or(SubmissionError::MissingState {
            stage,
            missing: "submission",
        })
    }

    fn restart(&mut self) {
        self.stage = Stage::CreateSubmission;
        self.submission = None;
        self.analysis_process = None;
    }
}

#[async_trait]
impl LoadActor for SubmitAnalysisMetadata {
    type Context = Arc<RunContext>;
    type Error = SubmissionError;

    async fn run_task(&mut self, ctx: &Self::Context) -> Result<TaskOutcome, SubmissionError> {
        let stage = self.stage;
        let span = info_span!("stage", name = stage.name());
        match self.run_stage(ctx).instrument(span).await {
            Ok(()) => {
                self.stage = stage.next();
                debug!(completed = %stage, next = %self.stage, "Stage done");
                Ok(TaskOutcome::Continue)
            }
            Err(e) => {
                self.restart();
                Err(e)
            }
        }
    }

    async fn on_stop(&mut self, ctx: &Self::Context) {
        ctx.actor_stopped().await;
    }
}
