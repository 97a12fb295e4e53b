//! JSON handlers for the `/api/v1` surface.
//!
//! Handlers only translate between HTTP and the domain: they decode and
//! validate input, call the store or one of the guarded components, and wrap
//! the result in its response envelope. Authorization has already been
//! decided by the route gate by the time a handler runs.

pub mod comments;
pub mod healthcheck;
pub mod posts;
pub mod users;

use axum::{http::Method, Json};
use serde_json::Value;

use crate::error::ApiError;

/// Handler result carrying a JSON envelope.
pub type ApiResult<T = Json<Value>> = Result<T, ApiError>;

/// Fallback for paths with no route.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
