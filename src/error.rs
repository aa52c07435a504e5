use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{preferences::PreferenceError, storage::StorageError},
    services::image_service::ImageError,
    state::{board::InvalidSessionId, palette::PaletteFull, state_machine::InvalidTransition},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Board store is unavailable or refused the write.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without a board store.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Uploaded bytes are not an image we can decode.
    #[error("unprocessable image: {0}")]
    Unprocessable(String),
    /// The scrapbook has not opened yet.
    #[error("locked until {0}")]
    Locked(String),
    /// Local preferences could not be persisted.
    #[error("preferences not saved")]
    Preferences(#[source] PreferenceError),
    /// Unexpected failure inside the server.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingRecord { session } => {
                ServiceError::NotFound(format!("board `{session}`"))
            }
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ImageError> for ServiceError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Decode(_) => ServiceError::Unprocessable(err.to_string()),
            ImageError::Encode(_) | ImageError::EmptySurface { .. } => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<PreferenceError> for ServiceError {
    fn from(err: PreferenceError) -> Self {
        ServiceError::Preferences(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<InvalidSessionId> for ServiceError {
    fn from(err: InvalidSessionId) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<PaletteFull> for ServiceError {
    fn from(err: PaletteFull) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Body was understood but cannot be processed.
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    /// Gated route requested before the unlock instant.
    #[error("locked: {0}")]
    Locked(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Local storage quota exhausted.
    #[error("insufficient storage: {0}")]
    InsufficientStorage(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Unprocessable(message) => AppError::Unprocessable(message),
            ServiceError::Locked(until) => AppError::Locked(format!("opens at {until}")),
            ServiceError::Preferences(source @ PreferenceError::QuotaExceeded { .. }) => {
                AppError::InsufficientStorage(source.to_string())
            }
            ServiceError::Preferences(source) => AppError::Internal(source.to_string()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InsufficientStorage(_) => StatusCode::INSUFFICIENT_STORAGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
