//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad or missing user input: category, counts, stage sets.
    #[error("{0}")]
    Validation(String),

    /// Unknown or unimplemented service identifier.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Tariff source unset, unreachable, malformed, or missing the
    /// service's row.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Anything a rule should never produce. Reported opaquely.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned for every failed request
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::ServiceNotFound(service) => (
                StatusCode::NOT_FOUND,
                "service_not_found",
                format!("Service not found: {}", service),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    format!("Configuration error: {}", msg),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Calculation failed".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = AppError::Validation("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::ServiceNotFound("building_and_pest".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Configuration("no row".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = AppError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_is_opaque() {
        // The display form carries the detail, the response body must not.
        let err = AppError::Internal("secret detail".into());
        assert!(err.to_string().contains("secret detail"));
    }
}
