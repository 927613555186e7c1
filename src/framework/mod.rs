//! Generic building blocks for simulated-user load runs.
//!
//! # Main Components
//!
//! - [`LoadActor`] - Trait that simulated-user types implement to be driven by a runner
//! - [`ActorRunner`] - Generic driver loop with shutdown and iteration budget
//! - [`ResourceQueue`] - Shared FIFO handing resources from producers to consumers
//! - [`poll_until`] - Fixed-delay polling for eventually-consistent fields
//! - [`FrameworkError`] - Common error types
//!
//! # Testing
//!
//! See [`mock`] module for a transport that answers from scripted expectations.

pub mod actor;
pub mod error;
pub mod mock;
pub mod poll;
pub mod queue;

pub use actor::{ActorReport, ActorRunner, LoadActor, TaskOutcome};
pub use error::FrameworkError;
pub use poll::{poll_until, PollPolicy};
pub use queue::ResourceQueue;
