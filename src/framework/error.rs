//! # Framework Errors
//!
//! Errors raised by the coordination primitives themselves, independent of any
//! HTTP call. Client and actor errors wrap these through `#[from]`.

/// Errors that can occur within the coordination framework.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    /// A bounded poll ran out of attempts before the awaited field appeared.
    #[error("Gave up waiting for {what} after {attempts} attempts")]
    PollExhausted { what: &'static str, attempts: u32 },
}
