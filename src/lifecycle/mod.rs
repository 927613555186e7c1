//! Run lifecycle: configuration, observability and orchestration.
//!
//! # Main Components
//!
//! - [`LoadConfig`] - Environment-driven run configuration
//! - [`LoadRun`] - Spawns the actor pools, stops them and reports
//! - [`RunContext`] - Dependencies shared by every actor of a run
//! - [`RequestStats`] - Per-request-name latency statistics
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod config;
pub mod load_run;
pub mod stats;
pub mod tracing;

pub use config::*;
pub use load_run::*;
pub use stats::*;
pub use self::tracing::*;
