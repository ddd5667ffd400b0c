//! Common API types and utilities

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::PlatformError;

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// `{"status": "ok"}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

/// Identifier of a newly created entity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdResponse {
    pub id: i64,
}

/// Path of a stored upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub status: String,
    pub path: String,
}

impl UploadResponse {
    pub fn new(path: String) -> Self {
        Self {
            status: "ok".to_string(),
            path,
        }
    }
}

/// Outcome of an idempotent set operation (like/unlike, add track)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangedResponse {
    pub status: String,
    pub changed: bool,
}

impl ChangedResponse {
    pub fn new(changed: bool) -> Self {
        Self {
            status: "ok".to_string(),
            changed,
        }
    }
}

/// JSON body whose shape errors answer 400 with the common error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PlatformError::validation(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_shape() {
        let json = serde_json::to_value(StatusResponse::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[test]
    fn test_changed_body_shape() {
        let json = serde_json::to_value(ChangedResponse::new(false)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok", "changed": false}));
    }
}
