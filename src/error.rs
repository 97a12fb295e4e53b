//! Error types for the blog backend.
//!
//! Each layer is owned by the component that produces it:
//! - `DbError` from the store
//! - `TokenError` from the token authority
//! - `WriteError` from conditional writes
//! - `ApiError` at the HTTP boundary, the only one that becomes a response
//!
//! Every response error shares one envelope: `{"error": <message>}`, where the
//! message is a string, or a field -> message map for validation failures.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rusqlite::ErrorCode;
use serde_json::json;
use thiserror::Error;

use crate::validator::FieldErrors;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched the key.
    #[error("record not found")]
    NotFound,

    /// The operation exceeded the configured query deadline.
    #[error("query timed out after {0}ms")]
    Timeout(u64),

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, message))
                if code.code == ErrorCode::ConstraintViolation =>
            {
                DbError::Constraint(message.unwrap_or_else(|| code.to_string()))
            }
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Errors from issuing or resolving bearer tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Plaintext is not a 26 character token. Rejected before any lookup.
    #[error("token must be 26 characters long")]
    Malformed,

    /// Unknown, expired, or out-of-scope token. Callers cannot tell which.
    #[error("token not found")]
    NotFound,

    /// `now + ttl` does not fit in a timestamp. Rejected before any write.
    #[error("token lifetime out of range")]
    ExpiryOutOfRange,

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Errors from a conditional write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The row changed (or vanished) since the caller read it.
    #[error("edit conflict")]
    Conflict,

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Errors returned by HTTP handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("request failed validation")]
    Validation(FieldErrors),

    #[error("invalid authentication credentials")]
    InvalidCredentials,

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated")]
    InactiveAccount,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    /// Unexpected fault. The cause is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Message sent for every internal error.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidCredentials
            | ApiError::InvalidAuthenticationToken
            | ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::InactiveAccount => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build a validation error for a single field.
    pub fn field(key: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(key.to_string(), message.to_string());
        ApiError::Validation(errors)
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Conflict => ApiError::EditConflict,
            WriteError::Store(e) => e.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::NotFound => ApiError::InvalidAuthenticationToken,
            TokenError::ExpiryOutOfRange => {
                ApiError::Internal(TokenError::ExpiryOutOfRange.to_string())
            }
            TokenError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({ "error": errors }),
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "Internal server error");
                json!({ "error": INTERNAL_ERROR_MESSAGE })
            }
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, ApiError::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
