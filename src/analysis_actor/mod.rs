//! Producer half of the split scenario.
//!
//! Each task creates a submission, hands it to the uploaders through the
//! submission queue, then attaches an analysis and its 30 file references.
//! A response without `_links` ends the task quietly: nothing is queued for
//! that step and nothing after it runs.

pub mod error;

pub use error::*;

use crate::framework::{LoadActor, TaskOutcome};
use crate::lifecycle::RunContext;
use crate::model::Resource;
use crate::submission_actor::{ADD_FILE_REFERENCE_LINK, PROCESSES_LINK, SELF_LINK};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const FILES_LINK: &str = "files";

#[derive(Debug, Default)]
pub struct AnalysisSubmitter {
    /// Accessioned input file bodies from `on_start`.
    input_files: Vec<Value>,
}

impl AnalysisSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_files(&self) -> &[Value] {
        &self.input_files
    }

    /// Creates a submission holding the two input files and waits until the
    /// server has accessioned both.
    async fn setup_input_bundle(&mut self, ctx: &RunContext) -> Result<(), AnalysisError> {
        let submission = ctx
            .core
            .create_submission("create new submission")
            .await?
            .ok_or(AnalysisError::InputBundle("submission"))?;
        let files_link = submission.get_link(FILES_LINK)?;

        for file in &ctx.fixtures.input_files {
            let created = ctx
                .core
                .add_input_file(files_link, file, "set up input file")
                .await?
                .ok_or(AnalysisError::InputBundle("input file"))?;
            let accessioned = ctx
                .core
                .wait_for_accessioning(created.get_link(SELF_LINK)?, ctx.accessioning_policy)
                .await?;
            self.input_files.push(accessioned);
        }
        info!(files = self.input_files.len(), "Input bundle ready");
        Ok(())
    }

    async fn add_analysis(&self, ctx: &RunContext, submission: &Resource) -> Result<(), AnalysisError> {
        let processes_link = submission.get_link(PROCESSES_LINK)?;
        let Some(analysis) = ctx
            .core
            .create_metadata(processes_link, &ctx.fixtures.analysis, "add analysis to submission")
            .await?
        else {
            debug!("No analysis in response, skipping file references");
            return Ok(());
        };

        let file_reference_link = analysis.get_link(ADD_FILE_REFERENCE_LINK)?.to_string();
        ctx.analysis_queue.queue(analysis);
        for file in &ctx.fixtures.output_files {
            ctx.core
                .add_output_file_to_process(&file_reference_link, file, "add file reference")
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LoadActor for AnalysisSubmitter {
    type Context = Arc<RunContext>;
    type Error = AnalysisError;

    async fn on_start(&mut self, ctx: &Self::Context) -> Result<(), AnalysisError> {
        self.setup_input_bundle(ctx).await
    }

    async fn run_task(&mut self, ctx: &Self::Context) -> Result<TaskOutcome, AnalysisError> {
        let Some(submission) = ctx.core.create_submission("create new submission").await? else {
            debug!("No submission in response, nothing queued");
            return Ok(TaskOutcome::Continue);
        };

        ctx.submission_queue.queue(submission.clone());
        self.add_analysis(ctx, &submission).await?;
        Ok(TaskOutcome::Continue)
    }

    async fn on_stop(&mut self, ctx: &Self::Context) {
        ctx.actor_stopped().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{HttpMethod, StaticTokenAuthenticator, SUBMISSION_ENVELOPES_PATH};
    use crate::framework::mock::MockTransport;
    use crate::lifecycle::LoadConfig;
    use crate::model::Fixtures;
    use serde_json::{json, Value};

    fn context(mock: &MockTransport) -> Arc<RunContext> {
        Arc::new(RunContext::new(
            &LoadConfig::default(),
            Arc::new(mock.clone()),
            Arc::new(StaticTokenAuthenticator::new("token")),
            Arc::new(Fixtures::with_analysis(json!({"content": {}}))),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_bundle_waits_for_both_files() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH)
            .return_json(json!({"_links": {"files": {"href": "/s0/files"}}}));
        mock.expect(HttpMethod::Post, "/s0/files")
            .return_json(json!({"_links": {"self": {"href": "/files/0"}}}));
        mock.expect(HttpMethod::Post, "/s0/files")
            .return_json(json!({"_links": {"self": {"href": "/files/1"}}}));
        mock.expect(HttpMethod::Get, "/files/0")
            .return_json(json!({"uuid": null, "_links": {"self": {"href": "/files/0"}}}));
        mock.expect(HttpMethod::Get, "/files/0")
            .return_json(json!({"uuid": {"uuid": "u0"}, "_links": {"self": {"href": "/files/0"}}}));
        mock.expect(HttpMethod::Get, "/files/1")
            .return_json(json!({"uuid": {"uuid": "u1"}, "_links": {"self": {"href": "/files/1"}}}));
        let ctx = context(&mock);

        let mut actor = AnalysisSubmitter::new();
        actor.on_start(&ctx).await.unwrap();

        assert_eq!(actor.input_files().len(), 2);
        let posted: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|call| call.url == "/s0/files")
            .map(|call| call.body.unwrap()["fileName"].clone())
            .collect();
        assert_eq!(posted, vec![json!("input_file_00.fastq.gz"), json!("input_file_01.fastq.gz")]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_task_queues_submission_and_analysis() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH)
            .return_json(json!({"_links": {"processes": {"href": "/p1"}, "self": {"href": "/s1"}}}));
        mock.expect(HttpMethod::Post, "/p1")
            .return_json(json!({"_links": {"add-file-reference": {"href": "/f1"}}}));
        mock.expect(HttpMethod::Put, "/f1").times(30).return_json(json!({}));
        let ctx = context(&mock);

        let outcome = AnalysisSubmitter::new().run_task(&ctx).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Continue);
        assert_eq!(ctx.submission_queue.len(), 1);
        assert_eq!(ctx.analysis_queue.len(), 1);
        let submission = ctx.submission_queue.try_take().unwrap();
        assert_eq!(submission.get_link("self"), Ok("/s1"));
        assert!(mock.calls().iter().skip(2).all(|call| call.name == "add file reference"));
        mock.verify();
    }

    #[tokio::test]
    async fn test_absent_submission_is_a_soft_failure() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH).return_json(json!({}));
        let ctx = context(&mock);

        let outcome = AnalysisSubmitter::new().run_task(&ctx).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Continue);
        assert!(ctx.submission_queue.is_empty());
        assert!(ctx.analysis_queue.is_empty());
    }

    #[tokio::test]
    async fn test_absent_analysis_still_queues_submission() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH)
            .return_json(json!({"_links": {"processes": {"href": "/p1"}}}));
        mock.expect(HttpMethod::Post, "/p1").return_json(Value::Null);
        let ctx = context(&mock);

        AnalysisSubmitter::new().run_task(&ctx).await.unwrap();

        assert_eq!(ctx.submission_queue.len(), 1);
        assert!(ctx.analysis_queue.is_empty());
        mock.verify();
    }
}
