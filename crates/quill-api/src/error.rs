use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::validation::ValidationErrors;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Note not found")]
    NotFound,
    #[error("Internal server error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl From<quill_core::Error> for AppError {
    fn from(error: quill_core::Error) -> Self {
        match error {
            quill_core::Error::Validation(errors) => Self::Validation(errors),
            quill_core::Error::NotFound(_) => Self::NotFound,
            quill_core::Error::Forbidden => Self::Forbidden,
            other => {
                tracing::error!(error = %other, "Note store failure");
                Self::Internal
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = self.to_string();
        let body = match self {
            Self::Validation(errors) => ErrorBody {
                error,
                errors: Some(errors),
            },
            _ => ErrorBody {
                error,
                errors: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_hide_details() {
        let error = AppError::from(quill_core::Error::Database("secret table name".to_string()));
        assert!(matches!(error, AppError::Internal));
        assert!(!error.to_string().contains("secret"));
    }

    #[test]
    fn core_errors_map_to_statuses() {
        let status = |error: quill_core::Error| AppError::from(error).into_response().status();

        assert_eq!(
            status(quill_core::Error::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(quill_core::Error::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status(quill_core::Error::Validation(ValidationErrors::single(
                "title",
                "Title is required"
            ))),
            StatusCode::BAD_REQUEST
        );
    }
}
