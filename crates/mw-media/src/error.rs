//! Media errors

use mw_core::MwError;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Media store error: {0}")]
    Store(String),
    #[error("Asset registration failed: {0}")]
    Registrar(String),
    #[error("Rasterizer failed: {0}")]
    Rasterize(String),
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

pub type MediaResult<T> = Result<T, MediaError>;

impl From<MediaError> for MwError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Storage(e) => MwError::Storage(e.to_string()),
            MediaError::Store(msg) => MwError::Database(msg),
            MediaError::Timeout { operation, seconds } => MwError::Timeout { operation, seconds },
            other => MwError::Internal(other.to_string()),
        }
    }
}
