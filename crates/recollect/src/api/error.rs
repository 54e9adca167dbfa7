//! JSON error responses for the HTTP surface

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::RecollectError;

/// A [`RecollectError`] on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub RecollectError);

impl From<RecollectError> for ApiError {
    fn from(err: RecollectError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RecollectError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecollectError::GenerationUnavailable(_) | RecollectError::GenerationRejected(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category reported in the response body
    pub fn error_type(&self) -> &'static str {
        match self.0 {
            RecollectError::Storage(_) => "storage_unavailable",
            RecollectError::Embedding(_) => "embedding_unavailable",
            RecollectError::GenerationUnavailable(_) => "generation_unavailable",
            RecollectError::GenerationRejected(_) => "generation_rejected",
            RecollectError::Config(_) => "configuration",
            RecollectError::InvalidInput(_) => "invalid_input",
            RecollectError::Io(_) => "io",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), "Request failed: {}", self.0);
        }

        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.0.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
