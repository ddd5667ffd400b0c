//! RPC status codes and their mapping to [`PlatformError`].

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::shared::error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Ok,
    Cancelled,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    Unauthenticated,
    Unavailable,
    Internal,
}

/// Structured detail that lets the client rebuild the typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Detail {
    Entity { entity: String, id: String },
    Field { entity: String, field: String },
    Limit { limit: usize },
    Mime { mime: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcStatus {
    pub code: Code,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Detail>,
}

impl RpcStatus {
    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    /// Client-side mapping. `service` names the upstream in transport-level
    /// errors.
    pub fn into_error(self, service: &str) -> PlatformError {
        match (self.code, self.detail) {
            (Code::NotFound, Some(Detail::Entity { entity, id })) => PlatformError::not_found(entity, id),
            (Code::NotFound, _) => PlatformError::not_found("resource", self.message),
            (Code::AlreadyExists, Some(Detail::Field { entity, field })) => PlatformError::duplicate(entity, field),
            (Code::AlreadyExists, _) => PlatformError::duplicate("resource", "value"),
            (Code::InvalidArgument, Some(Detail::Mime { mime })) => PlatformError::UnsupportedMediaType { mime },
            (Code::InvalidArgument, _) => PlatformError::validation(self.message),
            (Code::ResourceExhausted, Some(Detail::Limit { limit })) => PlatformError::PayloadTooLarge { limit },
            (Code::ResourceExhausted, _) => PlatformError::validation(self.message),
            (Code::Unauthenticated, _) => PlatformError::unauthorized(self.message),
            (Code::PermissionDenied, _) => PlatformError::forbidden(self.message),
            (Code::Ok, _) => PlatformError::upstream(service, "unexpected OK status"),
            (code, _) => PlatformError::upstream(service, format!("{:?}: {}", code, self.message)),
        }
    }
}

impl From<&PlatformError> for RpcStatus {
    fn from(err: &PlatformError) -> Self {
        match err {
            PlatformError::NotFound { entity, id } => RpcStatus::new(Code::NotFound, err.to_string()).with_detail(
                Detail::Entity {
                    entity: entity.clone(),
                    id: id.clone(),
                },
            ),
            PlatformError::Duplicate { entity, field } => RpcStatus::new(Code::AlreadyExists, err.to_string())
                .with_detail(Detail::Field {
                    entity: entity.clone(),
                    field: field.clone(),
                }),
            PlatformError::Validation { message } => RpcStatus::invalid_argument(message.clone()),
            PlatformError::Unauthorized { message } => RpcStatus::new(Code::Unauthenticated, message.clone()),
            PlatformError::InvalidCredential => RpcStatus::new(Code::Unauthenticated, err.to_string()),
            PlatformError::Forbidden { message } => RpcStatus::new(Code::PermissionDenied, message.clone()),
            PlatformError::PayloadTooLarge { limit } => {
                RpcStatus::new(Code::ResourceExhausted, err.to_string()).with_detail(Detail::Limit { limit: *limit })
            }
            PlatformError::UnsupportedMediaType { mime } => {
                RpcStatus::invalid_argument(err.to_string()).with_detail(Detail::Mime { mime: mime.clone() })
            }
            PlatformError::Database(_)
            | PlatformError::Storage(_)
            | PlatformError::Json(_)
            | PlatformError::Upstream { .. }
            | PlatformError::Internal { .. } => {
                error!(error = %err, "RPC handler failed");
                RpcStatus::new(Code::Internal, "internal error")
            }
        }
    }
}

impl From<PlatformError> for RpcStatus {
    fn from(err: PlatformError) -> Self {
        RpcStatus::from(&err)
    }
}
