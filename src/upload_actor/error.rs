//! Error types for the file uploader.

use crate::clients::ClientError;
use crate::model::ResourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Link(#[from] ResourceError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
