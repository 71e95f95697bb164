//! Maps engine failures onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cardex_core::engine::EngineError;
use cardex_sdk::objects::{ErrorKind, ErrorResponse};

/// Error returned by every API handler.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, ErrorKind) {
        match &self.0 {
            EngineError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput),
            EngineError::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorKind::Forbidden),
            EngineError::Conflict(_) => (StatusCode::CONFLICT, ErrorKind::Conflict),
            EngineError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, ErrorKind::InvalidTransition)
            }
            EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            EngineError::MissingCode { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::MissingCode)
            }
            EngineError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_kind();
        let message = match &self.0 {
            EngineError::Database(e) => {
                tracing::error!(error = %e, "API database error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error,
            message,
            current_status: self.0.current_status().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}
