use axum::{http::StatusCode, response::IntoResponse, response::Response, BoxError, Json};
use tokio::task::JoinError;
use tower::timeout::error::Elapsed;

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

/// Error returned by handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = match &e {
            DomainError::Validation(_) | DomainError::SourceUnavailable(_) => StatusCode::BAD_REQUEST,
            DomainError::Decode(_) | DomainError::Inference(_) | DomainError::Storage(_) | DomainError::ModelLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, message: e.to_string() }
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("processing task failed: {e}"),
        }
    }
}

/// Renders failures raised by tower middleware (request timeout) as `{error}`.
pub async fn layer_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError { status: StatusCode::REQUEST_TIMEOUT, message: "request timed out".into() }
    } else {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("unhandled middleware error: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}
