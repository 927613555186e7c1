//! Error types for the submission producer.

use crate::clients::ClientError;
use crate::model::ResourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The input bundle could not be set up because a response had no `_links`.
    #[error("Input bundle setup failed: no {0} in response")]
    InputBundle(&'static str),

    #[error(transparent)]
    Link(#[from] ResourceError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
