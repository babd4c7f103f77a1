use crate::backend::BackendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Failures raised inside the gateway itself, as opposed to backend statuses
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Request body is not a JSON document: {0}")]
    MalformedDocument(String),

    #[error("Missing capture: {0}")]
    MissingCapture(&'static str),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::MalformedDocument(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCapture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Callers only ever see the bare status code
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        self.status_code().into_response()
    }
}
