use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::error::ServiceError;
use thiserror::Error;
use utils::response::ApiResponse;

const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Invalid JSON format.")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Invalid request body.")]
    InvalidBody(#[source] serde_json::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl ApiError {
    fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Service(err) => match err {
                ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFoundError"),
                ServiceError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
                ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
            },
            ApiError::InvalidJson(_) | ApiError::InvalidBody(_) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "ValidationError")
            }
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Service(ServiceError::Storage(_)) => INTERNAL_ERROR_MESSAGE.to_string(),
            ApiError::Service(err) => err.to_string(),
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) | ApiError::Internal(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::error(&self.client_message());
        (status_code, Json(response)).into_response()
    }
}
