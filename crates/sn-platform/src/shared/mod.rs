//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod api_common;
pub mod db;
pub mod error;
pub mod file;
pub mod health_api;
pub mod middleware;
pub mod multipart;
pub mod validation;

pub use api_common::{ChangedResponse, ErrorResponse, IdResponse, JsonBody, StatusResponse, UploadResponse};
pub use error::{ErrorKind, PlatformError, Result};
pub use health_api::{health_router, HealthState};
pub use middleware::{AdmissionLayer, AdmissionState, AntiForgeryChecked, Authenticated, OptionalAuth, RequestContext};
pub use multipart::MultipartForm;
