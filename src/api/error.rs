use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::AppError;

use super::envelope::{ErrorEnvelope, ErrorField};

#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<ErrorField>),
    Forbidden(String),
    NotFound(String),
    Internal(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, envelope) = match self {
            ApiError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorEnvelope::new("ValidationError", "Request validation failed", fields),
            ),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorEnvelope::new("Forbidden", message, Vec::new()),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorEnvelope::new("NotFound", message, Vec::new()),
            ),
            ApiError::Internal(err) => {
                tracing::error!("request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new("InternalError", "Internal server error", Vec::new()),
                )
            }
        };
        (status, Json(envelope)).into_response()
    }
}
