//! # Load Run Orchestration
//!
//! [`LoadRun`] owns everything one run shares between its actors (the
//! [`RunContext`]), spawns the actor pools, stops them and reports.
//!
//! ## Run Steps
//!
//! 1. Start the auth session
//! 2. Spawn the pools for the configured [`Scenario`], staggered by the hatch rate
//! 3. Wait for the stop signal (run time elapsed, interrupt) or for every actor
//!    to finish on its own
//! 4. Tear down: end the auth session, clear both queues
//! 5. Return a [`RunSummary`]
//!
//! In the split scenario the submission queue is closed once every producer
//! has finished, so uploaders drain what is left and stop instead of waiting
//! forever.

use crate::analysis_actor::AnalysisSubmitter;
use crate::clients::{AuthError, Authenticator, CoreClient, HttpTransport, MeteredTransport, UploadClient};
use crate::framework::actor::stopped;
use crate::framework::{ActorReport, ActorRunner, LoadActor, PollPolicy, ResourceQueue};
use crate::lifecycle::{LoadConfig, RequestStats, RequestSummary, Scenario, TeardownScope};
use crate::model::Fixtures;
use crate::submission_actor::SubmitAnalysisMetadata;
use crate::upload_actor::FileUploader;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start auth session: {0}")]
    Auth(#[from] AuthError),
}

/// Dependencies shared by every actor of one run.
pub struct RunContext {
    pub core: CoreClient,
    pub uploads: UploadClient,
    pub fixtures: Arc<Fixtures>,
    /// Submissions waiting for their files to be uploaded.
    pub submission_queue: ResourceQueue,
    /// Analyses created by producers. Nothing consumes them yet.
    pub analysis_queue: ResourceQueue,
    pub accessioning_policy: PollPolicy,
    pub upload_area_policy: PollPolicy,
    pub authenticator: Arc<dyn Authenticator>,
    pub stats: Arc<RequestStats>,
    teardown_scope: TeardownScope,
    discarded: AtomicUsize,
}

impl RunContext {
    pub fn new(
        config: &LoadConfig,
        transport: Arc<dyn HttpTransport>,
        authenticator: Arc<dyn Authenticator>,
        fixtures: Arc<Fixtures>,
    ) -> Self {
        let stats = Arc::new(RequestStats::new());
        let transport: Arc<dyn HttpTransport> =
            Arc::new(MeteredTransport::new(transport, stats.clone()));
        Self {
            core: CoreClient::new(transport.clone(), authenticator.clone()),
            uploads: UploadClient::new(transport, config.file_upload_url.clone()),
            fixtures,
            submission_queue: ResourceQueue::new(),
            analysis_queue: ResourceQueue::new(),
            accessioning_policy: config.accessioning_policy(),
            upload_area_policy: config.upload_area_policy(),
            authenticator,
            stats,
            teardown_scope: config.teardown,
            discarded: AtomicUsize::new(0),
        }
    }

    pub fn teardown_scope(&self) -> TeardownScope {
        self.teardown_scope
    }

    /// Called from every actor's `on_stop`.
    pub async fn actor_stopped(&self) {
        if self.teardown_scope == TeardownScope::EveryActor {
            self.teardown().await;
        }
    }

    /// Ends the auth session and empties both queues. Returns how many queued
    /// resources were discarded.
    pub async fn teardown(&self) -> usize {
        self.authenticator.end_session().await;
        let discarded = self.submission_queue.clear() + self.analysis_queue.clear();
        self.discarded.fetch_add(discarded, Ordering::SeqCst);
        discarded
    }

    /// Resources discarded by every teardown so far.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scenario: Scenario,
    pub elapsed: Duration,
    pub requests: Vec<RequestSummary>,
    pub actors: Vec<ActorReport>,
    /// Queued resources nobody consumed before teardown.
    pub discarded: usize,
}

impl RunSummary {
    pub fn total_requests(&self) -> usize {
        self.requests.iter().map(|r| r.count).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.requests.iter().map(|r| r.failures).sum()
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn iterations(&self) -> u64 {
        self.actors.iter().map(|a| a.iterations).sum()
    }

    pub fn failed_iterations(&self) -> u64 {
        self.actors.iter().map(|a| a.failures).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## Load run: {} scenario, {:.1}s, {} actors",
            self.scenario,
            self.elapsed.as_secs_f64(),
            self.actors.len()
        )?;
        writeln!(f)?;
        writeln!(f, "| Request | Count | Failures | p50 (ms) | p95 (ms) | p99 (ms) |")?;
        writeln!(f, "|---|---|---|---|---|---|")?;
        for r in &self.requests {
            writeln!(
                f,
                "| {} | {} | {} | {:.2} | {:.2} | {:.2} |",
                r.name, r.count, r.failures, r.p50, r.p95, r.p99
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Requests: {} ({} failed, {:.1} req/s)",
            self.total_requests(),
            self.total_failures(),
            self.requests_per_second()
        )?;
        writeln!(
            f,
            "Iterations: {} ({} failed)",
            self.iterations(),
            self.failed_iterations()
        )?;
        write!(f, "Discarded queued resources: {}", self.discarded)
    }
}

/// One load run over a fixed configuration.
///
/// # Example
///
/// ```ignore
/// let run = LoadRun::new(config, transport, authenticator, fixtures);
/// let summary = run.execute_until(tokio::signal::ctrl_c()).await?;
/// println!("{summary}");
/// ```
pub struct LoadRun {
    config: LoadConfig,
    context: Arc<RunContext>,
}

impl LoadRun {
    pub fn new(
        config: LoadConfig,
        transport: Arc<dyn HttpTransport>,
        authenticator: Arc<dyn Authenticator>,
        fixtures: Arc<Fixtures>,
    ) -> Self {
        let context = Arc::new(RunContext::new(&config, transport, authenticator, fixtures));
        Self { config, context }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// Runs until the configured run time elapses, or until every actor has
    /// finished when there is no run time.
    pub async fn execute(self) -> Result<RunSummary, RunError> {
        self.execute_until(std::future::pending::<()>()).await
    }

    /// Like [`LoadRun::execute`], but also stops as soon as `stop` completes.
    pub async fn execute_until<F>(self, stop: F) -> Result<RunSummary, RunError>
    where
        F: Future,
    {
        let context = self.context.clone();
        context.authenticator.start_session().await?;

        let started = Instant::now();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(
            scenario = %self.config.scenario,
            users = self.config.users,
            hatch_rate = self.config.hatch_rate,
            "Starting load run"
        );

        let pools = self.run_pools(shutdown_rx);
        tokio::pin!(pools);
        let deadline = async {
            match self.config.run_time {
                Some(run_time) => tokio::time::sleep(run_time).await,
                None => std::future::pending().await,
            }
        };

        let finished = tokio::select! {
            actors = &mut pools => Some(actors),
            _ = deadline => {
                info!("Run time elapsed, stopping actors");
                None
            }
            _ = stop => {
                info!("Stop requested, stopping actors");
                None
            }
        };
        let actors = match finished {
            Some(actors) => actors,
            None => {
                let _ = shutdown_tx.send(true);
                pools.await
            }
        };

        if context.teardown_scope() == TeardownScope::Run {
            context.teardown().await;
        }

        let summary = RunSummary {
            scenario: self.config.scenario,
            elapsed: started.elapsed(),
            requests: context.stats.summaries(),
            actors,
            discarded: context.discarded(),
        };
        info!(
            requests = summary.total_requests(),
            failures = summary.total_failures(),
            discarded = summary.discarded,
            "Load run finished"
        );
        Ok(summary)
    }

    async fn run_pools(&self, shutdown: watch::Receiver<bool>) -> Vec<ActorReport> {
        let hatch = self.config.hatch_interval();
        match self.config.scenario {
            Scenario::Sequence => {
                let users = (0..self.config.users).map(|_| SubmitAnalysisMetadata::new());
                self.spawn_pool(users, hatch, shutdown).await
            }
            Scenario::Split => {
                let producers = (0..self.config.users).map(|_| AnalysisSubmitter::new());
                let uploaders = (0..self.config.uploaders).map(|_| FileUploader::new());
                // Both pools hatch side by side.
                let producers = async {
                    let reports = self.spawn_pool(producers, hatch, shutdown.clone()).await;
                    info!("Producers finished, closing submission queue");
                    self.context.submission_queue.close();
                    reports
                };
                let uploaders = self.spawn_pool(uploaders, hatch, shutdown.clone());
                let (mut reports, uploader_reports) = tokio::join!(producers, uploaders);
                reports.extend(uploader_reports);
                reports
            }
        }
    }

    /// Spawns one runner per actor, `hatch` apart, and collects their reports.
    async fn spawn_pool<A, I>(
        &self,
        actors: I,
        hatch: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<ActorReport>
    where
        A: LoadActor<Context = Arc<RunContext>>,
        I: IntoIterator<Item = A>,
    {
        let mut pool = JoinSet::new();
        for (index, actor) in actors.into_iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(hatch) => {}
                    _ = stopped(&mut shutdown) => break,
                }
            }
            let runner = ActorRunner::new(actor, shutdown.clone())
                .with_max_iterations(self.config.iterations);
            pool.spawn(runner.run(self.context.clone()));
        }

        let mut reports = Vec::with_capacity(pool.len());
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "Actor task failed"),
            }
        }
        reports
    }
}
