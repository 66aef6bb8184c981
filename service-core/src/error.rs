use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// One failed constraint on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Flattens `validator` output into a list sorted by field name.
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                code: e.code.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            details: Vec<FieldError>,
        }

        let (status, error_message, details) = match self {
            AppError::ValidationError(err) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                field_errors(&err),
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), Vec::new()),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), Vec::new()),
            AppError::Conflict(err) => (StatusCode::CONFLICT, err.to_string(), Vec::new()),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
                Vec::new(),
            ),
            // Server-side failures are logged in full but answered generically.
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Vec::new(),
                )
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    Vec::new(),
                )
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                    Vec::new(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}
