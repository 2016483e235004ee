//! API-level error type and HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dhc_store::StoreError;
use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 400: the request or message content is invalid
    #[error("{0}")]
    BadRequest(String),

    /// 404: no record with the given uuid
    #[error("{0}")]
    NotFound(String),

    /// 501: the feature is disabled by configuration
    #[error("{0}")]
    NotImplemented(String),

    /// 503: a downstream dependency is unavailable
    #[error("{0}")]
    ServiceUnavailable(String),

    /// 500: anything else
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(uuid) => {
                ApiError::NotFound(format!("No hl7_message with uuid {uuid}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, message = %self, "Request failed");
        } else {
            tracing::warn!(%status, message = %self, "Request rejected");
        }
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}
