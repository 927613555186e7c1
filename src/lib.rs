//! # Ingest Load
//!
//! > **A load generator for secondary-analysis submissions.**
//!
//! This crate simulates many concurrent users submitting "secondary analysis"
//! metadata and files to the ingest API. Each simulated user creates a
//! submission envelope, attaches an analysis process, references 30 output
//! files, waits for the upload area to be provisioned and uploads the files,
//! over and over, while per-request latency is recorded.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Eventual Consistency as a First-Class Concern
//!
//! The server provisions upload areas and accessions files asynchronously and
//! never notifies anyone. Two things bridge that gap:
//! - **Polling**: fixed-delay loops that re-fetch a resource until a nested field
//!   appears ([`framework::poll_until`]).
//! - **Hand-off queues**: producers push submissions, uploaders pop them when
//!   they are free ([`framework::ResourceQueue`]).
//!
//! ### One Driver Loop, Many Users
//!
//! You'll see `ActorRunner<T: LoadActor>` everywhere. The start/run/stop loop,
//! shutdown handling and failure accounting are written **once**; a simulated
//! user only says what one task does.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each layer defines its own error type (`TransportError`, `ClientError`,
//! `SubmissionError`, ...). `#[from]` conversions let `?` carry a failure from
//! the transport up to the actor, where the runner records a failed iteration.
//!
//! ### 2. Absence Is Not an Error
//! A response without `_links` becomes `None`, not `Err`. A polled field that
//! is not there yet means "try again", not "fail".
//!
//! ### 3. Async Context Injection
//! Actors are constructed empty; the shared [`RunContext`](lifecycle::RunContext)
//! (clients, queues, fixtures, poll policies) is handed to `run()`.
//!
//! ### 4. Observability
//! `tracing` everywhere with structured fields, one span per workflow stage.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! - **Role**: Generic actor driver, hand-off queue, polling, test doubles.
//! - **Key items**: [`LoadActor`](framework::LoadActor), [`ActorRunner`](framework::ActorRunner),
//!   [`ResourceQueue`](framework::ResourceQueue).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! - **Role**: Reads the configuration, spawns the actor pools, stops them and reports.
//! - **Key items**: [`LoadConfig`](lifecycle::LoadConfig), [`LoadRun`](lifecycle::LoadRun).
//!
//! ### 3. The Interface ([`clients`])
//! - **Role**: Typed operations over one HTTP seam, plus the auth contract.
//! - **Key items**: [`CoreClient`](clients::CoreClient), [`UploadClient`](clients::UploadClient),
//!   [`HttpTransport`](clients::HttpTransport).
//!
//! ### 4. The Users ([`submission_actor`], [`analysis_actor`], [`upload_actor`])
//! - **Role**: Concrete implementations of the `LoadActor` trait.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Ordered sequence, 10 users for 60 s against a local ingest
//! AUTH_TOKEN=... RUST_LOG=info cargo run
//!
//! # Producers and uploaders as separate pools
//! LOAD_SCENARIO=split LOAD_USERS=5 LOAD_UPLOADERS=20 cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod analysis_actor;
pub mod clients;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod submission_actor;
pub mod upload_actor;
