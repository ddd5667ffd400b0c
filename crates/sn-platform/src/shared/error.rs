//! Platform Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use crate::shared::api_common::ErrorResponse;

#[derive(Error, Debug)]
pub enum PlatformError {
    /// A repository found no row for the identifier.
    #[error("No such {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("A {entity} with this {field} already exists")]
    Duplicate { entity: String, field: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Unsupported media type: {mime}")]
    UnsupportedMediaType { mime: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream {service} error: {message}")]
    Upstream { service: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Error classification exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorised,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorised => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl PlatformError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Duplicate {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::NotFound { .. } => ErrorKind::NotFound,
            PlatformError::Duplicate { .. } => ErrorKind::Conflict,
            PlatformError::Validation { .. } => ErrorKind::BadRequest,
            PlatformError::Unauthorized { .. } | PlatformError::InvalidCredential => ErrorKind::Unauthorised,
            PlatformError::Forbidden { .. } => ErrorKind::Forbidden,
            PlatformError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            PlatformError::UnsupportedMediaType { .. } => ErrorKind::UnsupportedMediaType,
            PlatformError::Database(_)
            | PlatformError::Storage(_)
            | PlatformError::Json(_)
            | PlatformError::Upstream { .. }
            | PlatformError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True when the error is the typed "no such entity" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            // Logged inside the request span, which carries the request id.
            error!(error = %self, source = ?std::error::Error::source(&self), "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (kind.status(), Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_statuses() {
        let cases = [
            (PlatformError::not_found("playlist", 7), StatusCode::NOT_FOUND),
            (PlatformError::duplicate("user", "username"), StatusCode::CONFLICT),
            (PlatformError::validation("bad"), StatusCode::BAD_REQUEST),
            (PlatformError::unauthorized("no token"), StatusCode::UNAUTHORIZED),
            (PlatformError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (PlatformError::forbidden("not owner"), StatusCode::FORBIDDEN),
            (PlatformError::PayloadTooLarge { limit: 10 }, StatusCode::PAYLOAD_TOO_LARGE),
            (
                PlatformError::UnsupportedMediaType { mime: "text/plain".into() },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (PlatformError::upstream("search", "down"), StatusCode::INTERNAL_SERVER_ERROR),
            (PlatformError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.kind().status(), status, "{}", err);
        }
    }

    #[test]
    fn test_not_found_message_names_entity_and_id() {
        let err = PlatformError::not_found("playlist", 42);
        assert_eq!(err.to_string(), "No such playlist with id 42");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let response = PlatformError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
