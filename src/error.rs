use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Slot {0} does not exist")]
    SlotNotFound(Uuid),
    #[error("Slot store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SessionsFileError {
    #[error("Failed to read sessions file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse sessions file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::SlotNotFound(id) => AppError::NotFound(format!("Slot {id} not found")),
            other => AppError::Backend(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "Validation failed",
                    "fields": errors,
                })),
            )
                .into_response(),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Backend(err) => {
                error!(?err, "Slot backend failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}
