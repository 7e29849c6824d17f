//! Repository errors and shared helpers

use mw_core::MwError;
use mw_media::MediaError;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored value: {0}")]
    Decode(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for MwError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(value) => MwError::not_found("record", value),
            other => MwError::Database(other.to_string()),
        }
    }
}

impl From<RepositoryError> for MediaError {
    fn from(err: RepositoryError) -> Self {
        MediaError::Store(err.to_string())
    }
}

/// Convert an unsigned offset or limit into a SQL `BIGINT`, saturating
pub(crate) fn to_sql_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
