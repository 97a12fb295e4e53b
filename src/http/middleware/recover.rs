//! Panic containment.
//!
//! Installed once, near the outside of the pipeline, through
//! `CatchPanicLayer::custom(handle_panic)`.

use std::any::Any;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::observability::metrics;

/// Convert a caught panic into the generic 500 and close the connection.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    metrics::record_panic();

    let mut response = ApiError::Internal(format!("panic: {detail}")).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
