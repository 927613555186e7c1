//! Consumer half of the split scenario.
//!
//! Each task takes the next submission off the submission queue, waits for its
//! upload area and uploads the fixture files into it. The uploader stops for
//! good once the queue is closed and drained.

pub mod error;

pub use error::*;

use crate::framework::{LoadActor, TaskOutcome};
use crate::lifecycle::RunContext;
use crate::submission_actor::SELF_LINK;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FileUploader {
    uploaded: usize,
}

impl FileUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files uploaded by this actor so far.
    pub fn uploaded(&self) -> usize {
        self.uploaded
    }
}

#[async_trait]
impl LoadActor for FileUploader {
    type Context = Arc<RunContext>;
    type Error = UploadError;

    async fn run_task(&mut self, ctx: &Self::Context) -> Result<TaskOutcome, UploadError> {
        let Some(submission) = ctx.submission_queue.wait_for_resource().await else {
            debug!("Submission queue closed");
            return Ok(TaskOutcome::Stop);
        };

        let submission_link = submission.get_link(SELF_LINK)?;
        let upload_area = ctx
            .core
            .wait_for_upload_area(submission_link, ctx.upload_area_policy)
            .await?;
        self.uploaded += ctx
            .uploads
            .upload_files(&upload_area, &ctx.fixtures.output_files)
            .await?;
        Ok(TaskOutcome::Continue)
    }

    async fn on_stop(&mut self, ctx: &Self::Context) {
        ctx.actor_stopped().await;
    }
}
