//! Error types for the ordered submission sequence.

use crate::clients::ClientError;
use crate::model::ResourceError;
use crate::submission_actor::Stage;
use thiserror::Error;

/// Errors that fail one stage. Any of them restarts the sequence.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request went out but the response carried no `_links`.
    #[error("{stage}: response had no resource")]
    NoResource { stage: Stage },

    /// A stage ran before the stage that produces its input.
    #[error("{stage}: no {missing} from an earlier stage")]
    MissingState { stage: Stage, missing: &'static str },

    #[error(transparent)]
    Link(#[from] ResourceError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
