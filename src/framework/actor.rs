//! # Simulated-User Actors
//!
//! A [`LoadActor`] is one simulated user. It is sequential internally; all the
//! concurrency of a load run comes from running many of them side by side.
//!
//! [`ActorRunner`] is the generic driver, written once and reused for every
//! actor kind:
//!
//! 1. `on_start` (input bundle setup, session warm-up)
//! 2. `run_task` repeatedly, one task per iteration
//! 3. `on_stop`, always, whatever ended the loop
//!
//! The loop ends when the run's shutdown signal fires, when the iteration
//! budget is spent, or when a task reports [`TaskOutcome::Stop`]. A task still
//! in flight when the signal fires is dropped, which is how blocked polls and
//! queue waits get cancelled.
//!
//! # Context Injection
//!
//! Dependencies arrive through `run(context)` rather than the constructor, so
//! every actor of a run can share the same `Arc<RunContext>`.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What the runner should do after a successful task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Continue,
    /// No more work will ever arrive for this actor (e.g. its queue was closed).
    Stop,
}

/// Contract every simulated-user type implements to be driven by [`ActorRunner`].
#[async_trait]
pub trait LoadActor: Send + 'static {
    /// Shared dependencies injected at run time.
    type Context: Send + Sync + 'static;

    /// Error of a single task. Failed tasks are logged and counted, they never
    /// stop the actor.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn on_start(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs one iteration of the actor's workload.
    async fn run_task(&mut self, ctx: &Self::Context) -> Result<TaskOutcome, Self::Error>;

    async fn on_stop(&mut self, _ctx: &Self::Context) {}
}

/// Per-actor tally returned when a runner finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorReport {
    pub actor: &'static str,
    pub iterations: u64,
    pub failures: u64,
}

/// Drives one [`LoadActor`] until it is told to stop.
pub struct ActorRunner<T: LoadActor> {
    actor: T,
    shutdown: watch::Receiver<bool>,
    max_iterations: Option<u64>,
}

impl<T: LoadActor> ActorRunner<T> {
    pub fn new(actor: T, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            actor,
            shutdown,
            max_iterations: None,
        }
    }

    /// Caps the number of tasks (successful or not) this actor runs.
    pub fn with_max_iterations(mut self, max_iterations: Option<u64>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub async fn run(mut self, context: T::Context) -> ActorReport {
        // "SubmitAnalysisMetadata" rather than the full module path
        let actor = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown");
        let mut report = ActorReport {
            actor,
            iterations: 0,
            failures: 0,
        };
        info!(actor, "Actor started");

        let started = tokio::select! {
            _ = stopped(&mut self.shutdown) => None,
            result = self.actor.on_start(&context) => Some(result),
        };
        match started {
            Some(Ok(())) => self.run_tasks(&context, &mut report).await,
            Some(Err(e)) => {
                warn!(actor, error = %e, "on_start failed");
                report.failures += 1;
            }
            None => debug!(actor, "Stopped during on_start"),
        }

        self.actor.on_stop(&context).await;
        info!(actor, iterations = report.iterations, failures = report.failures, "Actor stopped");
        report
    }

    async fn run_tasks(&mut self, context: &T::Context, report: &mut ActorReport) {
        let actor = report.actor;
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            if self.max_iterations.is_some_and(|max| report.iterations >= max) {
                debug!(actor, "Iteration budget spent");
                break;
            }

            let result = tokio::select! {
                _ = stopped(&mut self.shutdown) => break,
                result = self.actor.run_task(context) => result,
            };

            report.iterations += 1;
            match result {
                Ok(TaskOutcome::Continue) => {}
                Ok(TaskOutcome::Stop) => {
                    debug!(actor, "No more work");
                    break;
                }
                Err(e) => {
                    report.failures += 1;
                    warn!(actor, error = %e, "Task failed");
                }
            }
        }
    }
}

pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender ends the run as well.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
