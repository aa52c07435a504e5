use std::error::Error;
use thiserror::Error;

use crate::dao::models::FieldError;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by board store backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed mid-request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend refused the write (permissions, schema, exhausted conflict retries).
    #[error("storage rejected write: {message}")]
    Rejected { message: String },
    /// A targeted write addressed a session that has no record yet.
    #[error("no board record for session `{session}`")]
    MissingRecord { session: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a rejection with a human readable reason.
    pub fn rejected(message: impl Into<String>) -> Self {
        StorageError::Rejected {
            message: message.into(),
        }
    }
}

impl From<FieldError> for StorageError {
    fn from(err: FieldError) -> Self {
        StorageError::rejected(err.to_string())
    }
}
