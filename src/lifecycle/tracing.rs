//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate for
//! the whole load generator.
//!
//! ## Configuration
//!
//! Compact format, no crate/module prefix (`with_target(false)`); the actor name
//! travels as a structured field instead. Levels come from `RUST_LOG` and default
//! to `info`.
//!
//! ## What Gets Traced
//!
//! - **Run lifecycle**: auth session, pool spawning, teardown, summary
//! - **Actor lifecycle**: start, stop, iteration and failure counts
//! - **Workflow stages**: one span per stage of the ordered sequence
//! - **Polling**: every absent result at `debug`, give-ups at `warn`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Run progress only (default)
//! RUST_LOG=info ingest-load
//!
//! # Every request and poll attempt
//! RUST_LOG=debug ingest-load
//!
//! # Only the framework internals
//! RUST_LOG=ingest_load::framework=debug ingest-load
//! ```
//!
//! With `RUST_LOG=info` an ordered-sequence user reads roughly like:
//!
//! ```text
//! INFO Actor started actor="SubmitAnalysisMetadata"
//! INFO stage{name="upload files"}: uploading dummy files upload_url=http://localhost:8070/v1/area/abc-123/files
//! INFO Actor stopped actor="SubmitAnalysisMetadata" iterations=8 failures=0
//! ```

use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init: a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
