//! Conversion error types and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed or incomplete request; the translator was not called
    #[error("Invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    /// The translator could not parse or re-emit the statement
    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ConvertError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Translation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The field a validation error refers to
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// "VALIDATION_ERROR", "TRANSLATION_ERROR" or "INTERNAL_ERROR"
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&ConvertError> for ErrorBody {
    fn from(err: &ConvertError) -> Self {
        match err {
            ConvertError::Validation { field, message } => Self {
                code: "VALIDATION_ERROR",
                message: message.clone(),
                field: Some(field.clone()),
            },
            ConvertError::Translation(message) => Self {
                code: "TRANSLATION_ERROR",
                message: message.clone(),
                field: None,
            },
            ConvertError::Internal(_) => Self {
                code: "INTERNAL_ERROR",
                message: "An internal error occurred.".to_string(),
                field: None,
            },
        }
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref e) = self {
            error!("Internal error while converting: {:#}", e);
        }
        let status = self.status_code();
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ConvertError::validation("query", "must not be empty").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ConvertError::Translation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConvertError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = ConvertError::Internal(anyhow::anyhow!("disk on fire"));
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("disk"));
    }

    #[test]
    fn test_validation_body_names_field() {
        let err = ConvertError::validation("dialect_from", "unrecognized dialect 'x'");
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(body["field"], "dialect_from");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
