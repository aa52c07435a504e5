//! Error types shared by the CouchDB board store.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::{models::FieldError, storage::StorageError};

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a database operation.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// A request to a document endpoint could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a document endpoint.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The document revision moved between our read and our write.
    #[error("revision conflict on `{path}`")]
    Conflict { path: String },
    /// Every retry of a read-modify-write cycle hit a revision conflict.
    #[error("gave up writing `{path}` after {attempts} revision conflicts")]
    ConflictRetriesExhausted { path: String, attempts: u32 },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Decoding a JSON value into the expected model failed.
    #[error("failed to deserialize CouchDB value for `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// A targeted write addressed a document that does not exist.
    #[error("board document `{doc_id}` does not exist")]
    MissingDocument { doc_id: String, session: String },
    /// The targeted field does not fit the stored record.
    #[error(transparent)]
    Field(#[from] FieldError),
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::MissingDocument { session, .. } => {
                StorageError::MissingRecord { session }
            }
            CouchDaoError::Field(field) => field.into(),
            err @ CouchDaoError::ConflictRetriesExhausted { .. } => {
                StorageError::rejected(err.to_string())
            }
            err @ CouchDaoError::RequestStatus { .. } => StorageError::rejected(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
